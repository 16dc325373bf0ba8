//! Users REST service.
//!
//! - **`domain`**: user records, create candidates and the validator.
//! - **`store`**: the `UserStore` capability with a JSON-file backend and a
//!   remote PostgREST table backend, plus the read-only `CatalogStore`.
//! - **`web`**: axum router and handlers over the shared stores.
//! - **`config`**: environment and command line configuration.

pub mod config;
pub mod domain;
pub mod store;
pub mod web;

use std::sync::Arc;

pub use config::{AppConfig, CliArgs, StoreBackend};
pub use domain::{SchemaProfile, UserCandidate, UserRecord, ValidationError};
pub use store::{
    Catalog, CatalogStore, FileCatalog, FileUserStore, RemoteCatalog, RemoteUserStore,
    StoreError, StoreResult, UserStore,
};
pub use web::{AppState, build_router};

/// Builds the store selected by `config`.
pub async fn open_store(config: &AppConfig) -> StoreResult<Arc<dyn UserStore>> {
    match config.backend {
        StoreBackend::File => {
            let store = FileUserStore::open(&config.users_file, config.schema).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Remote => {
            let remote = config.remote.clone().ok_or_else(|| {
                StoreError::storage("remote store selected without connection settings")
            })?;
            Ok(Arc::new(RemoteUserStore::new(remote, config.schema)?))
        }
    }
}

/// Builds the catalog source matching the selected store backend.
pub fn open_catalog(config: &AppConfig) -> StoreResult<Arc<dyn CatalogStore>> {
    match config.backend {
        StoreBackend::File => Ok(Arc::new(FileCatalog::new(config.catalog_dir()))),
        StoreBackend::Remote => {
            let remote = config.remote.as_ref().ok_or_else(|| {
                StoreError::storage("remote store selected without connection settings")
            })?;
            Ok(Arc::new(RemoteCatalog::new(remote)?))
        }
    }
}
