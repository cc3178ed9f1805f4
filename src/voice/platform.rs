//! Host speech engine seams
//!
//! Capture and synthesis are provided by the platform; the controller only
//! drives them through these traits.

use std::fmt;

use tokio::sync::mpsc;

use crate::protocol::ClientMessage;
use crate::{Error, Result};

/// Error reported by a speech capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Session was aborted (usually by our own stop/restart)
    Aborted,
    /// Nothing was heard before the session timed out
    NoSpeech,
    /// Microphone permission refused
    NotAllowed,
    /// No usable input device
    AudioCapture,
    /// Recognition service unreachable
    Network,
    /// Any other engine-specific failure
    Other(String),
}

impl CaptureError {
    /// Parse a platform error code such as `no-speech`
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "aborted" => Self::Aborted,
            "no-speech" => Self::NoSpeech,
            "not-allowed" => Self::NotAllowed,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    /// Errors that are expected during normal operation and never shown
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::Aborted | Self::NoSpeech)
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => f.write_str("aborted"),
            Self::NoSpeech => f.write_str("no-speech"),
            Self::NotAllowed => f.write_str("not-allowed"),
            Self::AudioCapture => f.write_str("audio-capture"),
            Self::Network => f.write_str("network"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Continuous speech recognizer with interim and final results
///
/// `start` only requests a session; the platform confirms it later, which
/// the owner forwards as a "capture started" event.
pub trait SpeechCapture {
    /// Request a new continuous capture session
    ///
    /// # Errors
    ///
    /// Returns the platform error if the session cannot be requested
    fn start(&mut self) -> std::result::Result<(), CaptureError>;

    /// Stop the current session, if any
    fn stop(&mut self);

    /// Whether a session is currently open
    fn is_active(&self) -> bool;
}

/// Text-to-speech output
pub trait SpeechSynthesizer {
    /// Begin speaking `text`
    ///
    /// # Errors
    ///
    /// Returns error if the engine rejects the utterance
    fn speak(&mut self, text: &str) -> Result<()>;

    /// Pause the current utterance
    fn pause(&mut self);

    /// Resume a paused utterance
    fn resume(&mut self);

    /// Drop the current utterance immediately
    fn cancel(&mut self);
}

/// Outbound half of the session channel
pub trait Outbox {
    /// Queue a message for the server
    ///
    /// # Errors
    ///
    /// Returns error if the channel is closed or full
    fn submit(&mut self, message: ClientMessage) -> Result<()>;
}

impl Outbox for mpsc::Sender<ClientMessage> {
    fn submit(&mut self, message: ClientMessage) -> Result<()> {
        self.try_send(message)
            .map_err(|e| Error::Channel(format!("failed to queue message: {e}")))
    }
}
