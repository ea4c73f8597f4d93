//! Automation webhook channel.
//!
//! Posts visitor messages to a configured automation workflow endpoint and
//! interprets its `{"response": "..."}` answer. An empty or missing answer
//! means "nothing to say" and triggers the operator fallback upstream.

pub mod client;

pub use client::WebhookAutomationClient;
