//! Telegram operator channel.
//!
//! Outbound: relays visitor messages to the configured operator chat as
//! formatted notices via the Bot API, embedding the session identifier
//! behind a fixed marker. Inbound: correlates webhook updates — `/reply`
//! commands and native reply-to-message events — back to visitor sessions
//! and appends them to the conversation log.

pub mod correlate;
pub mod error;
pub mod notify;

pub use {
    correlate::{Processed, ReplyCorrelator},
    error::{Error, Result},
    notify::TelegramNotifier,
};

/// Marker that precedes the session identifier in every outbound notice.
pub const SESSION_MARKER: &str = "Session: ";

/// Command an operator can use to reply without quoting the notice.
pub const REPLY_COMMAND: &str = "/reply";
