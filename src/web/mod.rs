//! HTTP surface
//!
//! Routes:
//! - `GET /` greeting
//! - `GET /api/users`, `POST /api/users`
//! - `GET /api/users/:id`, `DELETE /api/users/:id`
//! - `GET /api/customers`, `GET /api/countries` (read-only catalogs)
//!
//! Handlers only delegate to the stores held in [`AppState`] and turn the
//! outcome into JSON.

pub mod error;
pub mod handlers;
pub mod request_log;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::store::{CatalogStore, UserStore};

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use request_log::RequestLog;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub request_log: Option<Arc<RequestLog>>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            catalog,
            request_log: None,
        }
    }

    pub fn with_request_log(mut self, log: RequestLog) -> Self {
        self.request_log = Some(Arc::new(log));
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::home))
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/:id",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/api/customers", get(handlers::list_customers))
        .route("/api/countries", get(handlers::list_countries));

    if let Some(log) = state.request_log.clone() {
        router = router.layer(middleware::from_fn_with_state(log, request_log::record));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
