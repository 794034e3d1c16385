//! Fallback HTML page
//!
//! Renders `<assets>/server/templates/index.html` when present, otherwise the
//! page compiled into the binary. The `{{config}}` placeholder is replaced by
//! the client configuration as JSON.

use axum::{
    extract::State,
    http::Uri,
    response::Html,
};
use std::io::ErrorKind;
use tracing::debug;

use crate::{ApiError, ApiResult, AppState};

const INDEX_HTML: &str = include_str!("../../ui/index.html");
const CONFIG_PLACEHOLDER: &str = "{{config}}";

/// Fallback handler for every unmatched path
///
/// Unknown `/api/` paths get a JSON 404 instead of the page.
pub async fn serve_index(State(state): State<AppState>, uri: Uri) -> ApiResult<Html<String>> {
    if uri.path().starts_with("/api/") {
        return Err(ApiError::NotFound(uri.path().to_string()));
    }

    let template_path = state.params.http_templates_path().join("index.html");
    let template = match tokio::fs::read_to_string(&template_path).await {
        Ok(template) => template,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %template_path.display(), "No index template, using built-in page");
            INDEX_HTML.to_string()
        }
        Err(e) => return Err(e.into()),
    };

    let config = serde_json::to_string(&state.params.client_config())
        .map_err(|e| ApiError::Internal(format!("Failed to encode client config: {}", e)))?;

    // Keep the JSON from closing the surrounding <script> element
    let config = config.replace("</", "<\\/");

    Ok(Html(template.replace(CONFIG_PLACEHOLDER, &config)))
}
