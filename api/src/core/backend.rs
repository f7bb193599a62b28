//! Outbound client for the RAG backend.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use crate::{
    core::app_state::ProxyConfig,
    error_handler::{AppError, AppResult},
};

pub const QA_PATH: &str = "/v1/qa";
pub const QA_STREAM_PATH: &str = "/v1/qa/stream";
pub const TRANSCRIBE_PATH: &str = "/v1/transcribe";

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Shared reqwest client bound to one backend base URL.
pub struct BackendClient {
    client: reqwest::Client,
    base: String,
}

impl BackendClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(AppError::Client)?;
        Ok(Self {
            client,
            base: config.backend_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// POSTs `body` as JSON, unchanged.
    pub async fn post_json(
        &self,
        path: &str,
        request_id: &str,
        body: &Value,
    ) -> AppResult<reqwest::Response> {
        let url = self.url(path);
        debug!(%url, "forwarding JSON body");
        Ok(self
            .client
            .post(url)
            .header(REQUEST_ID_HEADER, request_id)
            .json(body)
            .send()
            .await?)
    }

    /// POSTs raw bytes with the caller's `Content-Type`, if any.
    ///
    /// Multipart bodies keep the boundary the client generated because the
    /// header is copied rather than rebuilt.
    pub async fn post_raw(
        &self,
        path: &str,
        request_id: &str,
        content_type: Option<&HeaderValue>,
        body: Bytes,
    ) -> AppResult<reqwest::Response> {
        let url = self.url(path);
        debug!(%url, bytes = body.len(), "forwarding raw body");
        let mut req = self
            .client
            .post(url)
            .header(REQUEST_ID_HEADER, request_id)
            .body(body);
        if let Some(ct) = content_type {
            req = req.header(header::CONTENT_TYPE, ct.as_bytes());
        }
        Ok(req.send().await?)
    }
}

/// Backend status as an axum status code.
pub fn relay_status(resp: &reqwest::Response) -> StatusCode {
    StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Re-emits the backend status and full body as `application/json`.
pub async fn relay_buffered(resp: reqwest::Response) -> AppResult<Response> {
    let status = relay_status(&resp);
    let body = resp.bytes().await?;
    Ok((
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        Body::from(body),
    )
        .into_response())
}
