use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::modules::package_updates::use_cases::dispatch_updates::inbound::http as dispatch_http;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(dispatch_http::health))
        .route("/status", get(dispatch_http::status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
