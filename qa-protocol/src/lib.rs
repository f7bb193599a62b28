//! Wire protocol shared by the chat client and the RAG QA backend.
//!
//! - [`models`]: request/response bodies of `/v1/qa` and `/v1/qa/stream`.
//! - [`event`]: the tagged JSON payloads carried by the event stream.
//! - [`sse`]: an incremental decoder turning raw byte chunks into events.

pub mod event;
pub mod models;
pub mod sse;

pub use event::StreamEvent;
pub use models::{DEFAULT_TOP_K, QaRequest, QaResponse, SourceItem};
pub use sse::SseDecoder;
