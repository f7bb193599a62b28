//! POST /v1/qa: blocking question answering, relayed to the backend.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    core::{
        app_state::AppState,
        backend::{QA_PATH, relay_buffered},
    },
    error_handler::AppResult,
    middleware_layer::request_trace::request_id,
};

/// Handler: POST /v1/qa
///
/// The JSON body is forwarded verbatim and the backend status and body come
/// back unchanged, errors included.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:3000/v1/qa \
///   -H 'content-type: application/json' \
///   -d '{"question":"宫颈癌的预防方法有哪些？","top_k":6}'
/// ```
pub async fn qa_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let request_id = request_id(&headers);

    let resp = state
        .backend
        .post_json(QA_PATH, &request_id, &body)
        .await
        .inspect_err(|err| warn!(error = %err, "qa: backend call failed"))?;

    let status = resp.status();
    if status.is_success() {
        debug!(status = status.as_u16(), "qa: relaying answer");
    } else {
        warn!(status = status.as_u16(), "qa: relaying backend error");
    }
    relay_buffered(resp).await
}
