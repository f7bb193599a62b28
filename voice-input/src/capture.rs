//! Microphone seam and the clip it produces.

use std::path::PathBuf;

use futures::future::BoxFuture;
use tracing::debug;

use crate::{error::VoiceError, upload::UPLOAD_MIME};

/// One finished recording, already encoded by the capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Audio device that can be opened for one recording at a time.
pub trait Microphone: Send + Sync {
    /// Acquires the device and starts buffering audio.
    fn open(&self) -> BoxFuture<'_, Result<Box<dyn Capture>, VoiceError>>;
}

/// A running recording.
///
/// `finish` consumes the capture: implementations release the device when
/// they are dropped, so the microphone is free as soon as the clip exists.
pub trait Capture: Send {
    fn finish(self: Box<Self>) -> AudioClip;
}

/// Accumulates encoded chunks as a device delivers them.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a chunk; empty chunks are dropped.
    pub fn push(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Concatenates everything buffered into one clip.
    pub fn into_clip(self, mime: impl Into<String>) -> AudioClip {
        AudioClip {
            bytes: self.chunks.concat(),
            mime: mime.into(),
        }
    }
}

/// Replays a pre-recorded, already encoded file as if it had been captured.
///
/// Used by the terminal client, which has no browser recorder.
pub struct ClipMicrophone {
    path: PathBuf,
    mime: String,
}

impl ClipMicrophone {
    /// Clip with the upload mime type (`audio/webm`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime: UPLOAD_MIME.to_string(),
        }
    }
}

struct ClipCapture {
    buffer: ChunkBuffer,
    mime: String,
}

impl Capture for ClipCapture {
    fn finish(self: Box<Self>) -> AudioClip {
        self.buffer.into_clip(self.mime)
    }
}

impl Microphone for ClipMicrophone {
    fn open(&self) -> BoxFuture<'_, Result<Box<dyn Capture>, VoiceError>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                VoiceError::Microphone(format!("{}: {e}", self.path.display()))
            })?;
            debug!(path = %self.path.display(), bytes = bytes.len(), "clip loaded");

            let mut buffer = ChunkBuffer::new();
            buffer.push(bytes);
            Ok(Box::new(ClipCapture {
                buffer,
                mime: self.mime.clone(),
            }) as Box<dyn Capture>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_drops_empty_chunks_and_concatenates() {
        let mut buf = ChunkBuffer::new();
        buf.push(vec![1, 2]);
        buf.push(Vec::new());
        buf.push(vec![3]);
        let clip = buf.into_clip("audio/webm");
        assert_eq!(clip.bytes, vec![1, 2, 3]);
        assert_eq!(clip.mime, "audio/webm");
    }
}
