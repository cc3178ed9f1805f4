//! Voice session module
//!
//! Client-side recording/playback state machine. Capture and synthesis are
//! delegated to the host speech engine through the traits in `platform`.

mod controller;
mod platform;
mod terminal;

pub use controller::{ChatEntry, Playback, Role, SessionState, VoiceSessionController};
pub use platform::{CaptureError, Outbox, SpeechCapture, SpeechSynthesizer};
pub use terminal::{TerminalCapture, TerminalSpeaker};
