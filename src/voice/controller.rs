//! Voice session controller
//!
//! Owns the client-side recording and playback state. Platform callbacks and
//! server messages are fed in as events; nothing here blocks or locks.

use chrono::{DateTime, Local};
use uuid::Uuid;

use super::platform::{CaptureError, Outbox, SpeechCapture, SpeechSynthesizer};
use crate::protocol::{ClientMessage, ServerMessage};

/// Recording state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not recording
    Idle,
    /// Capture requested, waiting for the platform to confirm
    Initializing,
    /// Capture running
    Recording,
}

/// Playback overlay; speech can run while recording continues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Silent,
    Speaking,
    Paused,
}

/// Who produced a chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One line of the visible conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

/// Bridges speech capture and synthesis to the session channel
pub struct VoiceSessionController<C: SpeechCapture, S: SpeechSynthesizer, O: Outbox> {
    capture: C,
    synth: S,
    outbox: O,
    state: SessionState,
    playback: Playback,
    transcript: String,
    entries: Vec<ChatEntry>,
    error: Option<String>,
    pending_request: Option<String>,
    last_response_id: Option<String>,
}

impl<C: SpeechCapture, S: SpeechSynthesizer, O: Outbox> VoiceSessionController<C, S, O> {
    /// Create an idle controller
    pub fn new(capture: C, synth: S, outbox: O) -> Self {
        Self {
            capture,
            synth,
            outbox,
            state: SessionState::Idle,
            playback: Playback::Silent,
            transcript: String::new(),
            entries: Vec::new(),
            error: None,
            pending_request: None,
            last_response_id: None,
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn playback(&self) -> Playback {
        self.playback
    }

    pub fn is_paused(&self) -> bool {
        self.playback == Playback::Paused
    }

    /// Live (possibly interim) transcript
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// User-visible advisory error, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Request id of the utterance still awaiting a response
    pub fn pending_request(&self) -> Option<&str> {
        self.pending_request.as_deref()
    }

    /// Whether any response has been played this session
    pub const fn has_response(&self) -> bool {
        self.last_response_id.is_some()
    }

    pub const fn capture(&self) -> &C {
        &self.capture
    }

    pub const fn synthesizer(&self) -> &S {
        &self.synth
    }

    pub const fn synthesizer_mut(&mut self) -> &mut S {
        &mut self.synth
    }

    /// Begin recording
    ///
    /// Only acts from `Idle`; while `Initializing` or `Recording` no second
    /// capture session is requested. Returns whether a session was requested.
    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Idle {
            tracing::debug!(state = ?self.state, "start ignored");
            return false;
        }

        self.state = SessionState::Initializing;
        self.error = None;

        if self.capture.is_active() {
            self.capture.stop();
        }

        match self.capture.start() {
            Ok(()) => {
                tracing::debug!("capture requested");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "capture failed to start");
                self.error = Some(format!("Error accessing microphone: {e}"));
                self.state = SessionState::Idle;
                false
            }
        }
    }

    /// Platform confirmed the capture session
    pub fn on_capture_started(&mut self) {
        if self.state == SessionState::Initializing {
            self.state = SessionState::Recording;
            tracing::info!("recording");
        }
    }

    /// Halt capture and synthesis and return to `Idle`
    pub fn stop(&mut self) {
        self.capture.stop();
        self.synth.cancel();
        self.state = SessionState::Idle;
        self.playback = Playback::Silent;
        self.transcript.clear();
        self.error = None;
        self.pending_request = None;
        tracing::info!("recording stopped");
    }

    /// Recognition result; final results are submitted to the server
    pub fn on_capture_result(&mut self, text: &str, is_final: bool) {
        if self.state == SessionState::Idle {
            return;
        }

        text.clone_into(&mut self.transcript);
        if !is_final || text.trim().is_empty() {
            return;
        }

        self.entries.push(ChatEntry {
            role: Role::User,
            text: text.to_string(),
            timestamp: Local::now(),
        });

        if let Some(previous) = &self.pending_request {
            tracing::debug!(previous = %previous, "superseding unanswered utterance");
        }

        let request_id = Uuid::new_v4().to_string();
        let message = ClientMessage::UtteranceSubmitted {
            text: text.to_string(),
            request_id: Some(request_id.clone()),
        };

        match self.outbox.submit(message) {
            Ok(()) => self.pending_request = Some(request_id),
            Err(e) => self.error = Some(format!("Error sending message: {e}")),
        }
    }

    /// Capture session ended; restart it while still recording
    pub fn on_capture_end(&mut self) {
        if self.state == SessionState::Recording {
            self.restart_capture();
        }
    }

    /// Capture error; benign kinds are suppressed
    pub fn on_capture_error(&mut self, error: &CaptureError) {
        if error.is_benign() {
            tracing::trace!(%error, "ignoring capture error");
            return;
        }
        tracing::warn!(%error, "capture error");
        self.error = Some(format!("Error occurred in recognition: {error}"));
    }

    /// Synthesis engine failure
    pub fn on_synthesis_error(&mut self, message: &str) {
        tracing::warn!(error = %message, "synthesis error");
        self.playback = Playback::Silent;
        self.error = Some(format!("Error playing response: {message}"));
    }

    /// Current utterance finished speaking
    pub fn on_speech_end(&mut self) {
        self.playback = Playback::Silent;
        if self.state == SessionState::Recording && !self.capture.is_active() {
            self.restart_capture();
        }
    }

    /// Apply a message from the server
    pub fn on_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected { session_id } => {
                tracing::info!(session_id = %session_id, "session channel connected");
            }
            ServerMessage::ResponseDelivered {
                text,
                id,
                request_id,
                ..
            } => self.on_response(text, id, request_id),
            ServerMessage::PauseRequested => {
                if self.playback == Playback::Speaking {
                    self.synth.pause();
                    self.playback = Playback::Paused;
                }
            }
            ServerMessage::ResumeRequested => {
                if self.playback == Playback::Paused {
                    self.synth.resume();
                    self.playback = Playback::Speaking;
                }
            }
            ServerMessage::Pong => tracing::trace!("pong"),
            ServerMessage::Error { code, message } => {
                tracing::warn!(code = %code, message = %message, "server reported error");
                self.error = Some(format!("Server error: {message}"));
            }
        }
    }

    /// Ask the server to pause playback; only while speaking
    pub fn interrupt(&mut self) -> bool {
        self.request(Playback::Speaking, ClientMessage::InterruptRequested)
    }

    /// Ask the server to resume playback; only while paused
    pub fn resume(&mut self) -> bool {
        self.request(Playback::Paused, ClientMessage::ResumeRequested)
    }

    /// Interrupt or resume depending on the pause flag
    pub fn toggle_audio(&mut self) -> bool {
        if self.is_paused() {
            self.resume()
        } else {
            self.interrupt()
        }
    }

    fn request(&mut self, required: Playback, message: ClientMessage) -> bool {
        if self.playback != required {
            return false;
        }
        match self.outbox.submit(message) {
            Ok(()) => true,
            Err(e) => {
                self.error = Some(format!("Error sending message: {e}"));
                false
            }
        }
    }

    fn on_response(&mut self, text: String, id: String, request_id: Option<String>) {
        if self.state == SessionState::Idle {
            tracing::debug!(response_id = %id, "dropping response after stop");
            return;
        }
        if let Some(request_id) = &request_id {
            if self.pending_request.as_ref() != Some(request_id) {
                tracing::debug!(response_id = %id, request_id = %request_id, "dropping stale response");
                return;
            }
        }

        self.pending_request = None;
        self.entries.push(ChatEntry {
            role: Role::Assistant,
            text: text.clone(),
            timestamp: Local::now(),
        });
        self.last_response_id = Some(id);

        self.synth.cancel();
        match self.synth.speak(&text) {
            Ok(()) => self.playback = Playback::Speaking,
            Err(e) => self.on_synthesis_error(&e.to_string()),
        }
    }

    fn restart_capture(&mut self) {
        match self.capture.start() {
            Ok(()) => tracing::debug!("capture restarted"),
            Err(CaptureError::Aborted) => {}
            Err(e) => {
                tracing::warn!(error = %e, "capture restart failed");
                self.error = Some(format!("Error restarting recognition: {e}"));
            }
        }
    }
}

impl<C: SpeechCapture, S: SpeechSynthesizer, O: Outbox> Drop for VoiceSessionController<C, S, O> {
    fn drop(&mut self) {
        self.capture.stop();
        self.synth.cancel();
    }
}
