//! Startup config validation.
//!
//! Produces diagnostics rather than hard errors: a bare install with no
//! channels configured still starts (messages are only logged), it just
//! gets warned about.

use secrecy::ExposeSecret;

use crate::schema::ChatrelayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

impl Diagnostic {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate(config: &ChatrelayConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let token_set = !config.telegram.bot_token.expose_secret().is_empty();
    let chat_set = !config.telegram.chat_id.is_empty();
    if token_set != chat_set {
        diagnostics.push(Diagnostic::error(
            "telegram",
            "both bot_token and chat_id are required for the operator channel",
        ));
    }
    if !token_set && !chat_set {
        diagnostics.push(Diagnostic::warning(
            "telegram",
            "no operator channel configured; visitor messages will only be logged",
        ));
    }

    if config.automation.enabled {
        if config.automation.webhook_url.is_empty() {
            diagnostics.push(Diagnostic::error(
                "automation.webhook_url",
                "automation is enabled but no webhook URL is set",
            ));
        }
        if config.automation.keywords.is_empty() {
            diagnostics.push(Diagnostic::warning(
                "automation.keywords",
                "automation is enabled but no keywords are set; nothing will qualify",
            ));
        }
        if config.automation.timeout_secs == 0 {
            diagnostics.push(Diagnostic::error(
                "automation.timeout_secs",
                "timeout must be at least 1 second",
            ));
        }
    }

    if config.limits.max_messages_per_window == 0 {
        diagnostics.push(Diagnostic::error(
            "limits.max_messages_per_window",
            "rate limit must allow at least one message",
        ));
    }
    if config.limits.window_secs == 0 {
        diagnostics.push(Diagnostic::error(
            "limits.window_secs",
            "rate window must be at least 1 second",
        ));
    }
    if config.limits.max_message_len == 0 {
        diagnostics.push(Diagnostic::error(
            "limits.max_message_len",
            "message length limit must be positive",
        ));
    }

    if config.site.url.is_empty() {
        diagnostics.push(Diagnostic::warning(
            "site.url",
            "site.url is empty; origin-address hashes will be unsalted across deployments",
        ));
    }

    diagnostics
}
