//! Transport seam between the controller and the QA proxy.
//!
//! [`QaTransport`] is what the controller talks to; [`HttpQaTransport`] is the
//! reqwest implementation used against a running proxy. Tests plug in
//! in-memory fakes.

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use qa_protocol::QaRequest;
use tracing::debug;

use crate::error::ChatError;

/// Response body chunks in arrival order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ChatError>>;

/// Body of a proxy reply.
pub enum ReplyBody {
    /// Fully buffered body.
    Text(String),
    /// Unbuffered body; only produced for successful streaming replies.
    Stream(ByteStream),
}

impl ReplyBody {
    /// Reads the whole body as text.
    pub async fn into_text(self) -> Result<String, ChatError> {
        match self {
            ReplyBody::Text(text) => Ok(text),
            ReplyBody::Stream(mut stream) => {
                let mut bytes = Vec::new();
                while let Some(chunk) = stream.next().await {
                    bytes.extend_from_slice(&chunk?);
                }
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    /// Exposes the body as a chunk stream; a buffered body becomes one chunk.
    pub fn into_stream(self) -> ByteStream {
        match self {
            ReplyBody::Text(text) => futures::stream::once(async move { Ok(text.into_bytes()) }).boxed(),
            ReplyBody::Stream(stream) => stream,
        }
    }
}

/// Status code plus body of one proxy call.
pub struct Reply {
    pub status: u16,
    pub body: ReplyBody,
}

impl Reply {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: ReplyBody::Text(body.into()),
        }
    }

    pub fn stream(status: u16, stream: ByteStream) -> Self {
        Self {
            status,
            body: ReplyBody::Stream(stream),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body of a 2xx reply, or [`ChatError::Http`] with the body text.
    pub async fn into_success(self) -> Result<ReplyBody, ChatError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            let status = self.status;
            let body = self.body.into_text().await?;
            Err(ChatError::Http { status, body })
        }
    }
}

/// Calls issued by the chat controller.
pub trait QaTransport: Send + Sync {
    /// `POST /v1/qa`.
    fn post_qa<'a>(&'a self, request: &'a QaRequest) -> BoxFuture<'a, Result<Reply, ChatError>>;

    /// `POST /v1/qa/stream`. Successful replies carry [`ReplyBody::Stream`].
    fn post_qa_stream<'a>(
        &'a self,
        request: &'a QaRequest,
    ) -> BoxFuture<'a, Result<Reply, ChatError>>;
}

/// reqwest client for the proxy endpoints.
pub struct HttpQaTransport {
    client: reqwest::Client,
    url_qa: String,
    url_qa_stream: String,
}

impl HttpQaTransport {
    /// Creates a transport for the proxy at `base` (e.g. `http://127.0.0.1:3000`).
    ///
    /// # Errors
    /// [`ChatError::Transport`] when the HTTP client cannot be built.
    pub fn new(base: &str) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base))
    }

    pub fn with_client(client: reqwest::Client, base: &str) -> Self {
        let base = base.trim().trim_end_matches('/');
        Self {
            client,
            url_qa: format!("{base}/v1/qa"),
            url_qa_stream: format!("{base}/v1/qa/stream"),
        }
    }
}

impl QaTransport for HttpQaTransport {
    fn post_qa<'a>(&'a self, request: &'a QaRequest) -> BoxFuture<'a, Result<Reply, ChatError>> {
        Box::pin(async move {
            debug!(url = %self.url_qa, top_k = request.top_k, "POST qa");
            let resp = self.client.post(&self.url_qa).json(request).send().await?;
            let status = resp.status().as_u16();
            let text = resp.text().await?;
            Ok(Reply::text(status, text))
        })
    }

    fn post_qa_stream<'a>(
        &'a self,
        request: &'a QaRequest,
    ) -> BoxFuture<'a, Result<Reply, ChatError>> {
        Box::pin(async move {
            debug!(url = %self.url_qa_stream, top_k = request.top_k, "POST qa stream");
            let resp = self
                .client
                .post(&self.url_qa_stream)
                .json(request)
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await?;
                return Ok(Reply::text(status.as_u16(), text));
            }

            let stream = resp
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(ChatError::from))
                .boxed();
            Ok(Reply::stream(status.as_u16(), stream))
        })
    }
}
