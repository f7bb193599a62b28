//! Push-to-talk voice input.
//!
//! [`VoiceRecorder`] is a small state machine (idle → recording → uploading →
//! idle). The audio device sits behind [`Microphone`] and the transcription
//! service behind [`Transcriber`]; both are seams so that front ends choose a
//! device backend and tests use fakes.
//!
//! The microphone is exclusive: it is opened on start and released on stop,
//! before the upload begins.

mod capture;
mod error;
mod recorder;
mod upload;

pub use capture::{AudioClip, Capture, ChunkBuffer, ClipMicrophone, Microphone};
pub use error::VoiceError;
pub use recorder::{Alerts, RecorderState, VoiceRecorder};
pub use upload::{
    HttpTranscriber, Transcriber, Transcript, UPLOAD_FIELD, UPLOAD_FILENAME, UPLOAD_MIME,
};
