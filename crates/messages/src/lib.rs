//! Append-only conversation log.
//!
//! Every visitor message, channel reply, and system notice lands here,
//! keyed by session and ordered by a globally monotonic id. The widget's
//! polling path reads messages after a cursor; the reply correlator looks
//! messages up by the operator channel's correlation id.

pub mod error;
pub mod model;
pub mod schema;
pub mod store;

pub use {
    error::{Error, Result},
    model::{Message, MessageKind, NewMessage, NewSender, SenderMeta},
    store::{MessageStore, SqliteMessageStore},
};
