use std::{
    sync::LazyLock,
    time::{SystemTime, UNIX_EPOCH},
};

use {regex::Regex, sha2::Digest};

/// Every session identifier starts with this tag.
pub const SESSION_ID_PREFIX: &str = "chat-";

/// Slug used when no name has been declared yet.
const ANONYMOUS_SLUG: &str = "default";

/// Slug used when a declared name contains no usable characters.
const EMPTY_NAME_SLUG: &str = "visitor";

/// Display name returned for identifiers that do not match the grammar.
const FALLBACK_DISPLAY_NAME: &str = "Visitor";

#[allow(clippy::expect_used)]
static SESSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^chat-([a-z0-9-]+)_[a-f0-9]{6}$").expect("session id regex"));

/// Generate a fresh session identifier, optionally embedding a display name.
///
/// The 6-hex suffix is derived from the name, a high-resolution clock and a
/// random value, so collisions are overwhelmingly unlikely even for equal
/// names. Always succeeds.
pub fn generate_session_id(name: Option<&str>) -> String {
    let slug = match name.map(str::trim) {
        Some(n) if !n.is_empty() => {
            let s = slugify(n);
            if s.is_empty() {
                EMPTY_NAME_SLUG.to_string()
            } else {
                s
            }
        },
        _ => ANONYMOUS_SLUG.to_string(),
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let salt: u64 = rand::random();

    let mut hasher = sha2::Sha256::new();
    hasher.update(name.unwrap_or_default().as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(salt.to_le_bytes());
    let digest = hasher.finalize();

    let mut suffix = String::with_capacity(6);
    for byte in digest.iter().take(3) {
        suffix.push_str(&format!("{byte:02x}"));
    }

    format!("{SESSION_ID_PREFIX}{slug}_{suffix}")
}

/// Check an identifier against the `chat-<slug>_<6hex>` grammar.
pub fn is_valid_session_id(session_id: &str) -> bool {
    SESSION_ID_RE.is_match(session_id)
}

/// Recover a human-readable display name from a session identifier.
///
/// `chat-ana-maria_a1b2c3` becomes `Ana Maria`. Identifiers that do not
/// match the grammar yield a fixed placeholder; this never fails.
pub fn extract_display_name(session_id: &str) -> String {
    let Some(captures) = SESSION_ID_RE.captures(session_id) else {
        return FALLBACK_DISPLAY_NAME.to_string();
    };
    let slug = &captures[1];

    let parts: Vec<String> = slug
        .split('-')
        .filter(|p| !p.is_empty())
        .map(title_case)
        .collect();
    if parts.is_empty() {
        return FALLBACK_DISPLAY_NAME.to_string();
    }
    parts.join(" ")
}

/// Reduce a display name to `[a-z0-9-]`: lowercase, runs of anything else
/// collapse to a single hyphen, leading/trailing hyphens trimmed.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn title_case(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_matches_grammar() {
        for name in [None, Some("Juan"), Some("Ana María!"), Some("  "), Some("株式会社")] {
            let id = generate_session_id(name);
            assert!(is_valid_session_id(&id), "bad id for {name:?}: {id}");
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_session_id(Some("juan"));
        let b = generate_session_id(Some("juan"));
        assert_ne!(a, b);
    }

    #[test]
    fn anonymous_uses_default_slug() {
        let id = generate_session_id(None);
        assert!(id.starts_with("chat-default_"), "{id}");
    }

    #[test]
    fn unusable_name_falls_back_to_visitor_slug() {
        let id = generate_session_id(Some("!!!"));
        assert!(id.starts_with("chat-visitor_"), "{id}");
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  Ana  María!! "), "ana-mar-a");
        assert_eq!(slugify("Juan"), "juan");
        assert_eq!(slugify("--x--"), "x");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn display_name_round_trips() {
        let id = generate_session_id(Some("ana maria"));
        assert_eq!(extract_display_name(&id), "Ana Maria");
    }

    #[test]
    fn display_name_title_cases_hyphenated_slug() {
        assert_eq!(extract_display_name("chat-juan_a1b2c3"), "Juan");
        assert_eq!(extract_display_name("chat-ana-maria_0fff00"), "Ana Maria");
    }

    #[test]
    fn invalid_id_yields_placeholder() {
        for bad in [
            "",
            "chat-juan",
            "chat-juan_XYZ123",
            "chat-Juan_a1b2c3",
            "session-juan_a1b2c3",
            "chat-juan_a1b2c3d",
        ] {
            assert_eq!(extract_display_name(bad), "Visitor", "input: {bad}");
        }
    }

    #[test]
    fn grammar_rejects_uppercase_hex() {
        assert!(!is_valid_session_id("chat-juan_A1B2C3"));
        assert!(is_valid_session_id("chat-juan_a1b2c3"));
    }
}
