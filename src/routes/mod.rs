//! HTTP surface of the relay
//!
//! - `/health` - local liveness check, never forwarded
//! - everything else - matched against the route table by [`relay::relay`]

pub mod health;
pub mod relay;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::proxy::AppState;

/// Create the relay router.
///
/// CORS is applied last so it wraps the fallback too: 404s and upstream
/// failures carry the same headers as successful relays. Request bodies are
/// not size-capped; base64 image payloads routinely exceed axum's 2 MB default.
pub fn create_router(state: AppState) -> Router {
    info!(routes = state.routes.routes().len(), "Creating relay router");

    let router = Router::new()
        .merge(health::router())
        .fallback(relay::relay)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http());

    apply_cors(router)
}
