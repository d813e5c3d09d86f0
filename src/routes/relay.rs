//! Fallback handler that relays matched paths to the upstream API.

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::proxy::AppState;

pub async fn relay(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let Some(upstream_path) = state.routes.resolve(uri.path()) else {
        debug!(path = %uri.path(), "No relay route");
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    info!(method = %method, path = %uri.path(), upstream = %upstream_path, "Relaying request");
    match state.upstream.forward(method, &upstream_path, body).await {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}
