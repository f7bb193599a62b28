//! Transcription upload through the `/v1/transcribe` proxy.

use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::{capture::AudioClip, error::VoiceError};

/// Multipart field carrying the clip.
pub const UPLOAD_FIELD: &str = "file";
/// The backend detects the container format from this extension.
pub const UPLOAD_FILENAME: &str = "voice_input.webm";
pub const UPLOAD_MIME: &str = "audio/webm";

/// Backend reply; fields other than `text` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: Option<String>,
}

impl Transcript {
    /// The transcript text when it is non-empty.
    pub fn non_empty(self) -> Option<String> {
        self.text.filter(|t| !t.is_empty())
    }
}

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, clip: AudioClip) -> BoxFuture<'_, Result<Transcript, VoiceError>>;
}

/// reqwest multipart uploader.
///
/// reqwest generates the multipart boundary and the matching `Content-Type`
/// header; no content type is set by hand.
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
}

impl HttpTranscriber {
    /// Uploader for the proxy at `base` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base: &str) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base))
    }

    pub fn with_client(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            url: format!("{}/v1/transcribe", base.trim().trim_end_matches('/')),
        }
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&self, clip: AudioClip) -> BoxFuture<'_, Result<Transcript, VoiceError>> {
        Box::pin(async move {
            debug!(url = %self.url, bytes = clip.bytes.len(), mime = %clip.mime, "uploading clip");
            let part = Part::bytes(clip.bytes)
                .file_name(UPLOAD_FILENAME)
                .mime_str(&clip.mime)?;
            let form = Form::new().part(UPLOAD_FIELD, part);

            let resp = self.client.post(&self.url).multipart(form).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(VoiceError::Upload {
                    status: status.as_u16(),
                });
            }
            Ok(resp.json::<Transcript>().await?)
        })
    }
}
