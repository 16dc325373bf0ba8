use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use userdeck::{
    AppConfig, AppState, CliArgs, StoreBackend, build_router, open_catalog, open_store,
    web::RequestLog,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = AppConfig::load(&args).context("failed to load application configuration")?;

    match config.backend {
        StoreBackend::File => info!(
            path = %config.users_file.display(),
            catalog_dir = %config.catalog_dir().display(),
            "user store: file"
        ),
        StoreBackend::Remote => info!("user store: remote table"),
    }

    let store = open_store(&config)
        .await
        .context("failed to initialize user store")?;

    let catalog = open_catalog(&config).context("failed to initialize catalog tables")?;

    let mut state = AppState::new(store.clone(), catalog);
    if let Some(path) = &config.request_log {
        info!(path = %path.display(), "request log enabled");
        state = state.with_request_log(RequestLog::new(path));
    }

    let app = build_router(state);

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "userdeck listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    store
        .flush()
        .await
        .context("failed to flush user store on shutdown")?;
    info!("userdeck stopped");

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("userdeck=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = until_signal("Ctrl+C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

/// Resolves when `signal` fires. A handler that cannot be installed never
/// resolves, so it cannot stop the server on its own.
async fn until_signal(name: &str, signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(err) = signal.await {
        error!(error = %err, signal = name, "unable to install signal handler");
        std::future::pending::<()>().await;
    }
}
