//! Render-ready snapshot of a chat session.
//!
//! The view only derives presentation facts (which panels exist, which
//! controls are enabled, what a citation tooltip says); markdown stays as
//! source text for the front end to render.

use qa_protocol::SourceItem;
use serde::Serialize;

use crate::session::ChatSession;

const UNKNOWN_SOURCE: &str = "unknown source";
const UNKNOWN_PAGE: &str = "?";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatView {
    pub question: String,
    pub controls: Controls,
    pub error: Option<String>,
    /// Present once any streamed text exists.
    pub stream_panel: Option<StreamPanel>,
    /// Empty until the stream reported `done`.
    pub stream_citations: Vec<Citation>,
    pub answer_panel: Option<AnswerPanel>,
    pub answer_citations: Vec<Citation>,
}

/// Enablement of the interactive controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub ask: bool,
    pub ask_stream: bool,
    pub clear: bool,
    /// Shares the clear slot: offered only while a request is in flight.
    pub abort: bool,
    /// Blocking request running (drives the "generating" label).
    pub asking: bool,
    /// Streaming request running and not yet `done`.
    pub streaming: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamPanel {
    /// `done` received.
    pub finished: bool,
    pub request_id: Option<String>,
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerPanel {
    pub request_id: String,
    pub latency_ms: u64,
    pub markdown: String,
}

/// Numbered marker for one source passage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    /// Stable key: `rank-source-page`.
    pub key: String,
    pub label: String,
    pub tooltip: CitationTooltip,
}

/// Details revealed on hover or tap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationTooltip {
    pub title: String,
    pub page: String,
    pub excerpt: Option<String>,
    /// `1 - distance`, three decimals.
    pub similarity: Option<String>,
}

impl From<&SourceItem> for Citation {
    fn from(item: &SourceItem) -> Self {
        let source = item.source.as_deref().unwrap_or("");
        let page = item.page.map(|p| p.to_string());
        Citation {
            key: format!(
                "{}-{}-{}",
                item.rank,
                source,
                page.as_deref().unwrap_or("")
            ),
            label: item.rank.to_string(),
            tooltip: CitationTooltip {
                title: item
                    .source
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
                page: page.unwrap_or_else(|| UNKNOWN_PAGE.to_string()),
                excerpt: item.excerpt.clone().filter(|e| !e.is_empty()),
                similarity: item.similarity().map(|s| format!("{s:.3}")),
            },
        }
    }
}

impl ChatView {
    /// Derives the view; `busy` is true while any request is in flight.
    pub fn build(session: &ChatSession, busy: bool) -> Self {
        let idle = !busy;

        let stream_panel = (!session.stream_text.is_empty()).then(|| StreamPanel {
            finished: !session.stream_loading,
            request_id: (!session.stream_request_id.is_empty())
                .then(|| session.stream_request_id.clone()),
            markdown: session.stream_text.clone(),
        });

        let stream_citations = if session.show_stream_sources {
            session.stream_sources.iter().map(Citation::from).collect()
        } else {
            Vec::new()
        };

        let answer_panel = session.answer.as_ref().map(|a| AnswerPanel {
            request_id: a.request_id.clone(),
            latency_ms: a.latency_ms,
            markdown: a.answer.clone(),
        });

        let answer_citations = session
            .answer
            .as_ref()
            .map(|a| a.sources.iter().map(Citation::from).collect())
            .unwrap_or_default();

        ChatView {
            question: session.question.clone(),
            controls: Controls {
                ask: idle,
                ask_stream: idle,
                clear: idle,
                abort: busy,
                asking: session.loading,
                streaming: session.stream_loading,
            },
            error: session.error.clone(),
            stream_panel,
            stream_citations,
            answer_panel,
            answer_citations,
        }
    }
}
