//! Inbound message routing — the glue between the visitor endpoint and the
//! outbound channels.
//!
//! Flow: sanitize text → validate session id → rate check → log visitor
//! message → classify by keyword → attempt automation with a bounded
//! timeout → fall back to the operator channel. Automation failures are
//! swallowed; the system favors "a human eventually sees it" over
//! failing fast.

pub mod classify;
pub mod engine;
pub mod error;
pub mod rate_limit;
pub mod sanitize;

pub use {
    engine::{DeliveredVia, EngineConfig, RoutingEngine, RoutingOutcome},
    error::{Error, Result},
    rate_limit::{RateDecision, RateLimiter},
};
