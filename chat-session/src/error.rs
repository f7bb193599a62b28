//! Typed error for the chat-session crate.
//!
//! Every variant ends up as the text of the session error panel, so the
//! `Display` output is what a user sees.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Proxy answered with a non-2xx status.
    #[error("{}", http_message(.status, .body))]
    Http { status: u16, body: String },

    /// Connection-level failure (proxy unreachable, reset, body read error).
    #[error("network error: {0}")]
    Transport(String),

    /// A 2xx body that is not a valid `QaResponse`.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// `error` event received in the middle of a stream.
    #[error("{0}")]
    Stream(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

/// Body text when present, otherwise `HTTP <status>`.
fn http_message(status: &u16, body: &str) -> String {
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}
