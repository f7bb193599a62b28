use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    capture::{Capture, Microphone},
    upload::Transcriber,
};

const MIC_UNAVAILABLE: &str = "Unable to access the microphone, check the device permissions.";
const TRANSCRIBE_FAILED: &str = "Speech transcription failed, please try again.";

/// User-facing notifications (browser `alert`, terminal message, ...).
pub trait Alerts: Send + Sync {
    fn alert(&self, message: &str);
}

impl<F> Alerts for F
where
    F: Fn(&str) + Send + Sync,
{
    fn alert(&self, message: &str) {
        self(message)
    }
}

/// Observable widget state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Uploading,
}

enum Phase {
    Idle,
    /// Microphone open request pending; reported as idle.
    Opening,
    Recording(Box<dyn Capture>),
    Uploading,
}

/// Push-to-talk widget: one press starts recording, the next uploads it.
pub struct VoiceRecorder<M, T> {
    microphone: M,
    transcriber: T,
    phase: Mutex<Phase>,
    disabled: AtomicBool,
    on_transcript: Box<dyn Fn(String) + Send + Sync>,
    alerts: Box<dyn Alerts>,
}

impl<M: Microphone, T: Transcriber> VoiceRecorder<M, T> {
    pub fn new(
        microphone: M,
        transcriber: T,
        on_transcript: impl Fn(String) + Send + Sync + 'static,
        alerts: impl Alerts + 'static,
    ) -> Self {
        Self {
            microphone,
            transcriber,
            phase: Mutex::new(Phase::Idle),
            disabled: AtomicBool::new(false),
            on_transcript: Box::new(on_transcript),
            alerts: Box::new(alerts),
        }
    }

    pub fn state(&self) -> RecorderState {
        match &*self.phase.lock() {
            Phase::Idle | Phase::Opening => RecorderState::Idle,
            Phase::Recording(_) => RecorderState::Recording,
            Phase::Uploading => RecorderState::Uploading,
        }
    }

    /// External disable, e.g. while the chat has a request in flight.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Whether the trigger accepts presses.
    pub fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst) && self.state() != RecorderState::Uploading
    }

    /// Trigger press: starts when idle, stops (and uploads) when recording.
    pub async fn toggle(&self) -> RecorderState {
        if !self.is_enabled() {
            debug!("voice trigger ignored: disabled");
            return self.state();
        }
        match self.state() {
            RecorderState::Idle => {
                self.start().await;
            }
            RecorderState::Recording => {
                self.stop().await;
            }
            RecorderState::Uploading => {}
        }
        self.state()
    }

    /// Opens the microphone. Failure raises an alert and leaves the widget idle.
    pub async fn start(&self) -> bool {
        {
            let mut phase = self.phase.lock();
            if !matches!(*phase, Phase::Idle) {
                return false;
            }
            *phase = Phase::Opening;
        }

        match self.microphone.open().await {
            Ok(capture) => {
                info!("recording started");
                *self.phase.lock() = Phase::Recording(capture);
                true
            }
            Err(err) => {
                warn!(error = %err, "microphone unavailable");
                *self.phase.lock() = Phase::Idle;
                self.alerts.alert(MIC_UNAVAILABLE);
                false
            }
        }
    }

    /// Finalises the recording, releases the microphone and uploads the clip.
    pub async fn stop(&self) -> bool {
        let capture = {
            let mut phase = self.phase.lock();
            match std::mem::replace(&mut *phase, Phase::Uploading) {
                Phase::Recording(capture) => capture,
                other => {
                    *phase = other;
                    return false;
                }
            }
        };

        // Consuming the capture drops the device handle before any I/O.
        let clip = capture.finish();
        info!(bytes = clip.bytes.len(), "recording stopped, uploading");

        match self.transcriber.transcribe(clip).await {
            Ok(transcript) => {
                if let Some(text) = transcript.non_empty() {
                    debug!(chars = text.chars().count(), "transcript received");
                    (self.on_transcript)(text);
                } else {
                    debug!("empty transcript");
                }
            }
            Err(err) => {
                error!(error = %err, "transcription failed");
                self.alerts.alert(TRANSCRIBE_FAILED);
            }
        }

        *self.phase.lock() = Phase::Idle;
        true
    }
}
