//! JSON payloads of the QA event stream.
//!
//! The backend frames every payload as `data: <json>` and tags it with a
//! `type` field. The tag, not the optional `event:` line, selects the variant.

use serde::{Deserialize, Serialize};

use crate::models::SourceItem;

/// One decoded stream payload.
///
/// Tags this client does not know deserialize into [`StreamEvent::Unknown`]
/// so that backend protocol additions do not break older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Retrieved passages; sent before any answer text.
    Sources {
        #[serde(default)]
        request_id: String,
        #[serde(default)]
        sources: Vec<SourceItem>,
    },
    /// Incremental answer text.
    Chunk {
        #[serde(default)]
        content: Option<String>,
    },
    /// Answer complete.
    Done {
        #[serde(default)]
        request_id: String,
        #[serde(default)]
        latency_ms: Option<u64>,
    },
    /// Backend failure in the middle of a stream.
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Short tag name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Sources { .. } => "sources",
            StreamEvent::Chunk { .. } => "chunk",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_tags() {
        let ev: StreamEvent = serde_json::from_str(
            r#"{"type":"sources","request_id":"r2","sources":[{"rank":1,"source":"guide.pdf","page":3}]}"#,
        )
        .unwrap();
        match ev {
            StreamEvent::Sources {
                request_id,
                sources,
            } => {
                assert_eq!(request_id, "r2");
                assert_eq!(sources[0].source.as_deref(), Some("guide.pdf"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let ev: StreamEvent =
            serde_json::from_str(r#"{"type":"error","request_id":"r2","message":"boom"}"#).unwrap();
        assert_eq!(
            ev,
            StreamEvent::Error {
                message: Some("boom".into())
            }
        );
    }

    #[test]
    fn unknown_tag_and_missing_fields() {
        let ev: StreamEvent = serde_json::from_str(r#"{"type":"heartbeat","n":1}"#).unwrap();
        assert_eq!(ev, StreamEvent::Unknown);

        let ev: StreamEvent = serde_json::from_str(r#"{"type":"chunk"}"#).unwrap();
        assert_eq!(ev, StreamEvent::Chunk { content: None });

        let ev: StreamEvent = serde_json::from_str(r#"{"type":"done"}"#).unwrap();
        assert_eq!(ev.kind(), "done");
    }

    #[test]
    fn payload_without_tag_is_rejected() {
        assert!(serde_json::from_str::<StreamEvent>(r#"{"content":"x"}"#).is_err());
    }
}
