//! prism-server library interface
//!
//! Thin route layer over resolved [`Params`]: favicon, static assets, health,
//! client configuration and a fallback HTML page. Exposed as a library so
//! the router can be driven in tests without binding a port.

use axum::Router;
use chrono::{DateTime, Utc};
use prism_common::bootstrap::Bootstrap;
use prism_common::Params;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved parameters; every served path derives from these
    pub params: Arc<Params>,
    /// Lazily initialized database backend
    pub bootstrap: Arc<Bootstrap>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(params: Params) -> Self {
        Self::with_bootstrap(Arc::new(Bootstrap::new(params)))
    }

    /// Share an existing bootstrap handle (and its parameters)
    pub fn with_bootstrap(bootstrap: Arc<Bootstrap>) -> Self {
        Self {
            params: Arc::new(bootstrap.params().clone()),
            bootstrap,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// **Routes:**
/// - `GET /favicon.ico` → `<assets>/server/favicons/favicon.ico`
/// - `GET /assets/*` → files under `<assets>/server/public`
/// - `GET /health`
/// - `GET /api/v1/config`, `/api/v1/status`, `/api/v1/buildinfo`
/// - anything else → HTML index page carrying the client configuration
pub fn build_router(state: AppState) -> Router {
    let favicon = ServeFile::new(state.params.http_favicons_path().join("favicon.ico"));
    let public = ServeDir::new(state.params.http_public_path());

    Router::new()
        .route_service("/favicon.ico", favicon)
        .nest_service("/assets", public)
        .merge(api::health_routes())
        .nest("/api/v1", api::v1_routes())
        .fallback(api::serve_index)
        .with_state(state)
}
