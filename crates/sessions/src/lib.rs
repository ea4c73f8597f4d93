//! Visitor session identity.
//!
//! A session is identified by an opaque token of the form
//! `chat-<slug>_<6 hex chars>` where the slug is derived from the visitor's
//! declared display name. The token is embedded in operator notices so that
//! asynchronous replies can be correlated back to the right visitor.

pub mod context;
pub mod error;
pub mod id;

pub use {
    context::{SessionContext, SessionRegistry},
    error::{Error, Result},
    id::{extract_display_name, generate_session_id, is_valid_session_id, SESSION_ID_PREFIX},
};
