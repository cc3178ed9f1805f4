//! Session channel wire messages
//!
//! Frames are JSON text tagged by `type`. Both the server handler and the
//! client bridge share these definitions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// A finalized utterance awaiting a reply
    #[serde(rename_all = "camelCase")]
    UtteranceSubmitted {
        text: String,
        /// Correlation id echoed back on the matching response
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Ask the server to pause playback
    InterruptRequested,
    /// Ask the server to resume playback
    ResumeRequested,
    /// Keepalive
    Ping,
}

/// Message sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Connection established
    #[serde(rename_all = "camelCase")]
    Connected { session_id: String },
    /// Reply to an utterance
    #[serde(rename_all = "camelCase")]
    ResponseDelivered {
        text: String,
        /// Milliseconds since the Unix epoch
        timestamp: i64,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Pause synthesis
    PauseRequested,
    /// Resume synthesis (echo of the client's request)
    ResumeRequested,
    /// Keepalive reply
    Pong,
    /// Frame could not be handled
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Build a response for `text`, stamped now
    #[must_use]
    pub fn response(text: String, request_id: Option<String>) -> Self {
        Self::ResponseDelivered {
            text,
            timestamp: Utc::now().timestamp_millis(),
            id: Uuid::new_v4().to_string(),
            request_id,
        }
    }

    /// Short name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::ResponseDelivered { .. } => "response-delivered",
            Self::PauseRequested => "pause-requested",
            Self::ResumeRequested => "resume-requested",
            Self::Pong => "pong",
            Self::Error { .. } => "error",
        }
    }
}
