use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    backend: String,
}

/// Handler: GET /health
///
/// Liveness only; the backend is not contacted.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        backend: state.config.backend_base.clone(),
    })
}
