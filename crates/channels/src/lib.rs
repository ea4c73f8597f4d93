//! Outbound channel adapters.
//!
//! The routing engine talks to two pluggable transports: an automation
//! endpoint that may answer a visitor message, and an operator channel
//! that relays it to a human. Both are behind traits here so transports
//! stay swappable and the engine stays testable.

pub mod adapter;

pub use adapter::{AutomationChannel, AutomationRequest, OperatorChannel, VisitorNotice};
