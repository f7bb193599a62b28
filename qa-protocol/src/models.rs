use serde::{Deserialize, Serialize};

/// Number of retrieved passages the chat client asks for.
pub const DEFAULT_TOP_K: u32 = 6;

/// Request payload for `/v1/qa` and `/v1/qa/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRequest {
    /// Trimmed, non-empty question text.
    pub question: String,
    /// Number of source passages the backend should retrieve.
    pub top_k: u32,
}

impl QaRequest {
    /// Builds a request with [`DEFAULT_TOP_K`].
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Full answer returned by the blocking endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResponse {
    pub request_id: String,
    /// Markdown answer text.
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceItem>,
    pub latency_ms: u64,
}

/// One retrieved passage backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// 1-based position, unique within one answer.
    pub rank: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<u32>,
    /// Vector distance; lower means more similar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl SourceItem {
    /// `1 - distance`, when a distance was reported.
    pub fn similarity(&self) -> Option<f64> {
        self.distance.map(|d| 1.0 - d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_tolerates_missing_sources_and_optional_fields() {
        let raw = r#"{"request_id":"r1","answer":"**hi**","latency_ms":120}"#;
        let resp: QaResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.sources.is_empty());

        let raw = r#"{"request_id":"r1","answer":"a","latency_ms":1,
                      "sources":[{"rank":1,"source":null,"page":3}]}"#;
        let resp: QaResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.sources[0].source, None);
        assert_eq!(resp.sources[0].page, Some(3));
        assert_eq!(resp.sources[0].similarity(), None);
    }

    #[test]
    fn request_uses_fixed_top_k() {
        let body = serde_json::to_value(QaRequest::new("宫颈癌的预防方法有哪些？")).unwrap();
        assert_eq!(body["top_k"], 6);
        assert_eq!(body["question"], "宫颈癌的预防方法有哪些？");
    }
}
