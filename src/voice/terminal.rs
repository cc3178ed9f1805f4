//! Terminal stand-ins for the host speech engine
//!
//! Typed lines act as final recognition results and replies are "spoken" by
//! printing them, with a playback clock so pause and resume behave like a
//! real synthesizer.

use std::io::Write;
use std::time::Duration;

use tokio::time::Instant;

use super::platform::{CaptureError, SpeechCapture, SpeechSynthesizer};
use crate::{Error, Result};

/// Speaking rate used to estimate utterance length
const WORDS_PER_MINUTE: u64 = 170;

/// Line-based capture: open while recording, fed by the owner's stdin loop
#[derive(Debug, Default)]
pub struct TerminalCapture {
    active: bool,
}

impl TerminalCapture {
    #[must_use]
    pub const fn new() -> Self {
        Self { active: false }
    }
}

impl SpeechCapture for TerminalCapture {
    fn start(&mut self) -> std::result::Result<(), CaptureError> {
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug)]
struct Utterance {
    remaining: Duration,
    resumed_at: Option<Instant>,
}

/// Prints replies and tracks when the current one would finish
pub struct TerminalSpeaker<W: Write> {
    out: W,
    current: Option<Utterance>,
}

impl<W: Write> TerminalSpeaker<W> {
    pub const fn new(out: W) -> Self {
        Self { out, current: None }
    }

    /// Estimated speaking time for `text`
    #[must_use]
    pub fn duration_for(text: &str) -> Duration {
        let words = u64::try_from(text.split_whitespace().count()).unwrap_or(u64::MAX);
        Duration::from_millis(words.saturating_mul(60_000) / WORDS_PER_MINUTE)
    }

    /// When the current utterance ends, if one is playing (not paused)
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        let utterance = self.current.as_ref()?;
        utterance.resumed_at.map(|at| at + utterance.remaining)
    }

    /// Mark the current utterance as finished
    pub fn finish(&mut self) {
        self.current = None;
    }

    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    pub const fn output(&self) -> &W {
        &self.out
    }
}

impl<W: Write> SpeechSynthesizer for TerminalSpeaker<W> {
    fn speak(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "assistant> {text}")
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::Voice(format!("failed to write reply: {e}")))?;

        self.current = Some(Utterance {
            remaining: Self::duration_for(text),
            resumed_at: Some(Instant::now()),
        });
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(utterance) = &mut self.current {
            if let Some(at) = utterance.resumed_at.take() {
                utterance.remaining = utterance.remaining.saturating_sub(at.elapsed());
            }
            tracing::debug!(remaining_ms = utterance.remaining.as_millis(), "playback paused");
        }
    }

    fn resume(&mut self) {
        if let Some(utterance) = &mut self.current {
            if utterance.resumed_at.is_none() {
                utterance.resumed_at = Some(Instant::now());
                tracing::debug!("playback resumed");
            }
        }
    }

    fn cancel(&mut self) {
        self.current = None;
    }
}
