use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatrelayConfig {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub widget: WidgetConfig,
    pub telegram: TelegramConfig,
    pub automation: AutomationConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Trust X-Forwarded-For / X-Real-IP when resolving the client address.
    pub behind_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8480,
            behind_proxy: false,
        }
    }
}

/// The website this chat belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name shown in operator notices and automation payloads.
    pub name: String,
    /// Canonical site URL; also salts the origin-address privacy hash.
    pub url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Website".into(),
            url: String::new(),
        }
    }
}

/// Settings handed to the chat widget at bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub title: String,
    pub welcome_message: String,
    pub error_message: String,
    /// How often the widget polls for new messages, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            title: "Support chat".into(),
            welcome_message: "Hi! How can we help?".into(),
            error_message: "Sorry, something went wrong. Please try again.".into(),
            poll_interval_ms: 3000,
        }
    }
}

/// Telegram operator channel.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,
    /// Chat the notices are sent to.
    pub chat_id: String,
    /// Outbound send timeout in seconds.
    pub timeout_secs: u64,
}

impl TelegramConfig {
    /// Both token and destination chat must be present for the operator
    /// channel to exist.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.bot_token.expose_secret().is_empty() && !self.chat_id.is_empty()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            chat_id: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Automation webhook channel.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub enabled: bool,
    pub webhook_url: String,
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// A message qualifies for automation when it contains any of these,
    /// case-insensitively.
    pub keywords: Vec<String>,
}

impl AutomationConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for AutomationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationConfig")
            .field("enabled", &self.enabled)
            .field("webhook_url", &self.webhook_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("keywords", &self.keywords)
            .finish()
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: String::new(),
            api_key: Secret::new(String::new()),
            timeout_secs: 10,
            keywords: Vec::new(),
        }
    }
}

/// Inbound message limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Messages a session may send per window.
    pub max_messages_per_window: u32,
    /// Rate window length in seconds.
    pub window_secs: u64,
    /// Maximum message length after sanitization.
    pub max_message_len: usize,
}

impl LimitsConfig {
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_messages_per_window: 20,
            window_secs: 60,
            max_message_len: 1000,
        }
    }
}

/// Message log storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path.
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: "chatrelay.db".into(),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let cfg = ChatrelayConfig::default();
        assert_eq!(cfg.limits.max_messages_per_window, 20);
        assert_eq!(cfg.limits.window_secs, 60);
        assert_eq!(cfg.limits.max_message_len, 1000);
        assert_eq!(cfg.automation.timeout_secs, 10);
        assert_eq!(cfg.telegram.timeout_secs, 30);
        assert!(!cfg.automation.enabled);
        assert!(!cfg.telegram.is_configured());
    }

    #[test]
    fn deserialize_partial_toml() {
        let cfg: ChatrelayConfig = toml::from_str(
            r#"
            [site]
            name = "Acme Web"

            [telegram]
            bot_token = "123:ABC"
            chat_id = "-100200300"

            [automation]
            enabled = true
            webhook_url = "https://flows.acme.test/hook"
            keywords = ["hosting", "domain"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.site.name, "Acme Web");
        assert!(cfg.telegram.is_configured());
        assert_eq!(cfg.telegram.bot_token.expose_secret(), "123:ABC");
        assert!(cfg.automation.enabled);
        assert_eq!(cfg.automation.keywords, vec!["hosting", "domain"]);
        // Unset sections keep their defaults.
        assert_eq!(cfg.server.port, 8480);
        assert_eq!(cfg.widget.poll_interval_ms, 3000);
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg: ChatrelayConfig = toml::from_str(
            r#"
            [telegram]
            bot_token = "very-secret"

            [automation]
            api_key = "also-secret"
            "#,
        )
        .unwrap();
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn serialize_round_trip() {
        let cfg = ChatrelayConfig::default();
        let toml_str = toml::to_string(&cfg).unwrap();
        let back: ChatrelayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.limits.max_message_len, cfg.limits.max_message_len);
    }
}
