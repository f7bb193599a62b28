//! POST /v1/transcribe: multipart audio upload relay.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    core::{
        app_state::AppState,
        backend::{TRANSCRIBE_PATH, relay_status},
    },
    error_handler::{AppError, AppResult},
    middleware_layer::request_trace::request_id,
};

/// Handler: POST /v1/transcribe
///
/// The multipart body and its `Content-Type` (with the client's boundary)
/// are forwarded untouched. Errors are reported as `{"error": ...}`:
/// the backend status for a refused transcription, 500 for anything else.
pub async fn transcribe_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match forward(&state, &headers, body).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn forward(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Response> {
    let body = body?;
    let request_id = request_id(headers);

    let resp = state
        .backend
        .post_raw(
            TRANSCRIBE_PATH,
            &request_id,
            headers.get(header::CONTENT_TYPE),
            body,
        )
        .await
        .map_err(|err| {
            error!(error = %err, "transcribe: backend call failed");
            AppError::internal(err)
        })?;

    if !resp.status().is_success() {
        warn!(status = resp.status().as_u16(), "transcribe: backend refused");
        return Err(AppError::Http {
            status: relay_status(&resp),
            code: "TRANSCRIBE_FAILED",
            message: "Backend transcription failed".to_string(),
        });
    }

    let data: Value = resp.json().await.map_err(|err| {
        error!(error = %err, "transcribe: undecodable backend reply");
        AppError::internal(err)
    })?;
    debug!("transcribe: relaying transcript");
    Ok((StatusCode::OK, Json(data)).into_response())
}
