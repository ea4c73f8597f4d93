//! HTTP surface of the router.
//!
//! Visitor-facing endpoints (bootstrap, send, poll, declare name), the
//! Telegram webhook, anti-forgery tokens, and client address resolution
//! behind proxies.

pub mod csrf;
pub mod handlers;
pub mod net;
pub mod routes;
pub mod server;
pub mod state;

pub use {server::start_gateway, state::AppState};
