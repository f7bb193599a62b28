//! POST /v1/qa/stream: event-stream relay.
//!
//! Streaming is only promised once the backend status is known to be 2xx; a
//! failing backend gets the same buffered passthrough as `/v1/qa`.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    core::{
        app_state::AppState,
        backend::{QA_STREAM_PATH, relay_buffered, relay_status},
    },
    error_handler::AppResult,
    middleware_layer::request_trace::request_id,
};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Handler: POST /v1/qa/stream
pub async fn qa_stream_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let request_id = request_id(&headers);

    let resp = state
        .backend
        .post_json(QA_STREAM_PATH, &request_id, &body)
        .await
        .inspect_err(|err| warn!(error = %err, "qa_stream: backend call failed"))?;

    if !resp.status().is_success() {
        warn!(
            status = resp.status().as_u16(),
            "qa_stream: backend refused, relaying buffered error"
        );
        return relay_buffered(resp).await;
    }

    debug!("qa_stream: relaying event stream");
    let status = relay_status(&resp);
    Ok((
        status,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/event-stream"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ],
        Body::from_stream(resp.bytes_stream()),
    )
        .into_response())
}
