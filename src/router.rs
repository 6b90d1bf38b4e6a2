use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::handlers::{health_handler, metrics_handler, proxy_handler};
use crate::state::AppState;

// Assemble the production router. /health and /metrics sit outside the
// proxy pipeline: unauthenticated, not rate limited. Everything under
// /api/ goes through the proxy handler for each supported verb.
pub fn build_router(state: Arc<AppState>) -> Router {
    let proxy = get(proxy_handler)
        .post(proxy_handler)
        .put(proxy_handler)
        .patch(proxy_handler)
        .delete(proxy_handler);

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/{*path}", proxy)
        .with_state(state)
}
