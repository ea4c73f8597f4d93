//! Configuration loading, env substitution, and validation.
//!
//! Config files: `chatrelay.toml`, `chatrelay.yaml`, or `chatrelay.json`
//! Searched in `./` then `~/.config/chatrelay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        AutomationConfig, ChatrelayConfig, LimitsConfig, ServerConfig, SiteConfig, StorageConfig,
        TelegramConfig, WidgetConfig,
    },
    validate::{Diagnostic, Severity, validate},
};
