//! Configuration and backend status endpoints

use axum::{extract::State, Json};
use prism_common::config::ClientConfig;
use prism_common::db::{get_schema_version, CURRENT_SCHEMA_VERSION};
use prism_common::DatabaseDriver;
use serde::Serialize;

use crate::{ApiResult, AppState};

/// GET /api/v1/config
///
/// Browser-facing configuration; no filesystem paths.
pub async fn get_client_config(State(state): State<AppState>) -> Json<ClientConfig> {
    Json(state.params.client_config())
}

/// Backend status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub driver: DatabaseDriver,
    pub schema_version: i64,
    pub current_schema_version: i64,
}

/// GET /api/v1/status
///
/// Initializes the backend on first call (connect + migrate).
///
/// **Error Handling:**
/// - Connection or migration failure: 500 with `DATABASE_ERROR`/`CONFIG_ERROR`
pub async fn get_status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let backend = state.bootstrap.backend().await?;
    let schema_version = get_schema_version(backend.pool()).await?;

    Ok(Json(StatusResponse {
        driver: backend.driver(),
        schema_version,
        current_schema_version: CURRENT_SCHEMA_VERSION,
    }))
}
