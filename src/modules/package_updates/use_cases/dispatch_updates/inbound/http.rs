use axum::{Json, extract::State, response::IntoResponse};

use crate::shell::state::AppState;

pub async fn health() -> &'static str {
    "OK"
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.status.snapshot().await)
}
