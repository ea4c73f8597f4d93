use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ChatrelayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatrelay.toml",
    "chatrelay.yaml",
    "chatrelay.yml",
    "chatrelay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ChatrelayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatrelay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chatrelay/chatrelay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChatrelayConfig::default()` if no config file is found.
pub fn discover_and_load() -> ChatrelayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ChatrelayConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/chatrelay/
    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/chatrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatrelay").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ChatrelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let cfg = parse_config(
            "[site]\nname = \"Acme\"\n",
            Path::new("chatrelay.toml"),
        )
        .unwrap();
        assert_eq!(cfg.site.name, "Acme");
    }

    #[test]
    fn parses_yaml() {
        let cfg = parse_config("site:\n  name: Acme\n", Path::new("chatrelay.yaml")).unwrap();
        assert_eq!(cfg.site.name, "Acme");
    }

    #[test]
    fn parses_json() {
        let cfg = parse_config(
            r#"{"site": {"name": "Acme"}}"#,
            Path::new("chatrelay.json"),
        )
        .unwrap();
        assert_eq!(cfg.site.name, "Acme");
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(parse_config("", Path::new("chatrelay.ini")).is_err());
    }
}
