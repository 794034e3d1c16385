//! HTTP API handlers for prism-server

pub mod buildinfo;
pub mod config;
pub mod health;
pub mod ui;

pub use buildinfo::get_build_info;
pub use config::{get_client_config, get_status};
pub use health::health_routes;
pub use ui::serve_index;

use crate::AppState;
use axum::{routing::get, Router};

/// Routes nested under `/api/v1`
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_client_config))
        .route("/status", get(get_status))
        .route("/buildinfo", get(get_build_info))
}
