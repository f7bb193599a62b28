use qa_protocol::{QaResponse, SourceItem, StreamEvent};
use tracing::{debug, warn};

use crate::error::ChatError;

/// All interaction state of one chat page.
///
/// Nothing here outlives the page; [`ChatSession::reset`] returns to the
/// freshly-loaded state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSession {
    pub question: String,
    /// Blocking request in flight.
    pub loading: bool,
    /// Streaming request in flight and not yet `done`.
    pub stream_loading: bool,
    /// Last blocking answer.
    pub answer: Option<QaResponse>,
    pub stream_text: String,
    pub stream_sources: Vec<SourceItem>,
    /// Set by `done`; sources are revealed only after the answer is complete.
    pub show_stream_sources: bool,
    pub stream_request_id: String,
    pub stream_latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ChatSession {
    pub fn reset(&mut self) {
        *self = ChatSession::default();
    }

    pub(crate) fn clear_stream(&mut self) {
        self.stream_text.clear();
        self.stream_sources.clear();
        self.show_stream_sources = false;
        self.stream_request_id.clear();
        self.stream_latency_ms = None;
    }

    /// Applies one decoded stream event.
    ///
    /// # Errors
    /// Returns [`ChatError::Stream`] for an `error` event; the caller stops
    /// reading the stream.
    pub fn apply(&mut self, event: StreamEvent) -> Result<(), ChatError> {
        match event {
            StreamEvent::Sources {
                request_id,
                sources,
            } => {
                debug!(request_id = %request_id, count = sources.len(), "stream: sources");
                self.stream_request_id = request_id;
                self.stream_sources = sources;
            }
            StreamEvent::Chunk { content } => {
                if let Some(text) = content.filter(|c| !c.is_empty()) {
                    self.stream_text.push_str(&text);
                }
            }
            StreamEvent::Done {
                request_id,
                latency_ms,
            } => {
                debug!(request_id = %request_id, latency_ms = ?latency_ms, "stream: done");
                self.stream_request_id = request_id;
                self.stream_latency_ms = latency_ms;
                self.stream_loading = false;
                self.show_stream_sources = true;
            }
            StreamEvent::Error { message } => {
                return Err(ChatError::Stream(
                    message.unwrap_or_else(|| "Stream error".to_string()),
                ));
            }
            StreamEvent::Unknown => {
                warn!("stream: ignoring event with unknown type tag");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_reveals_sources_even_without_sources_event() {
        let mut s = ChatSession {
            stream_loading: true,
            ..Default::default()
        };
        s.apply(StreamEvent::Done {
            request_id: "r9".into(),
            latency_ms: Some(5),
        })
        .unwrap();
        assert!(s.show_stream_sources);
        assert!(!s.stream_loading);
        assert!(s.stream_sources.is_empty());
        assert_eq!(s.stream_request_id, "r9");
    }

    #[test]
    fn chunks_accumulate_and_empty_content_is_ignored() {
        let mut s = ChatSession::default();
        for content in [Some("a".to_string()), None, Some(String::new()), Some("b".into())] {
            s.apply(StreamEvent::Chunk { content }).unwrap();
        }
        s.apply(StreamEvent::Unknown).unwrap();
        assert_eq!(s.stream_text, "ab");
    }

    #[test]
    fn sources_replace_previous_list_without_showing() {
        let mut s = ChatSession::default();
        let item = |rank| SourceItem {
            rank,
            source: None,
            page: None,
            chunk: None,
            distance: None,
            excerpt: None,
        };
        s.stream_sources = vec![item(1), item(2)];
        s.apply(StreamEvent::Sources {
            request_id: "r1".into(),
            sources: vec![item(7)],
        })
        .unwrap();
        assert_eq!(s.stream_sources, vec![item(7)]);
        assert!(!s.show_stream_sources);
    }

    #[test]
    fn error_event_carries_message_or_default() {
        let mut s = ChatSession::default();
        let err = s
            .apply(StreamEvent::Error {
                message: Some("model crashed".into()),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "model crashed");

        let err = s.apply(StreamEvent::Error { message: None }).unwrap_err();
        assert_eq!(err.to_string(), "Stream error");
    }
}
