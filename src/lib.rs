//! Voicechat Gateway - Voice assistant chat server and client
//!
//! This library provides:
//! - A rule-based assistant responder
//! - The session channel protocol and its WebSocket endpoint
//! - A user record store with a REST API
//! - The client-side voice session controller
//! - Clients for the session channel, record API and location lookup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Client                          │
//! │   Voice Controller  │  Record Client  │  Location    │
//! └──────────┬──────────────────┬───────────────────────┘
//!            │ /ws              │ /api/users
//! ┌──────────▼──────────────────▼───────────────────────┐
//! │                   Gateway Server                     │
//! │   Session Channel  │  Responder  │  Record Store     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod location;
pub mod protocol;
pub mod records;
pub mod responder;
pub mod voice;

pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use client::{SessionClient, session_url};
pub use config::{Config, DatabaseLocation};
pub use db::{DbPool, NewUser, UserPatch, UserRecord, UserRepo};
pub use error::{Error, Result};
pub use location::{LocationDetails, LocationLookup, Position, PositionError, locate};
pub use protocol::{ClientMessage, ServerMessage};
pub use records::RecordClient;
pub use responder::{Responder, generate};
pub use voice::{CaptureError, VoiceSessionController};
