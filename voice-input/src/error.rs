use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Microphone could not be opened (denied, absent, busy).
    #[error("microphone unavailable: {0}")]
    Microphone(String),

    /// Transcription endpoint answered with a non-2xx status.
    #[error("transcription request failed with HTTP {status}")]
    Upload { status: u16 },

    /// Connection-level failure while uploading.
    #[error("transcription transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading a pre-recorded clip failed.
    #[error("audio clip error: {0}")]
    Io(#[from] std::io::Error),
}
