//! Visitor message sanitation.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script[^>]*>.*?</script>",
        r"(?i)javascript:",
        r"(?i)\bon\w+\s*=",
        r"(?i)<iframe[^>]*>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("injection pattern"))
    .collect()
});

/// Trim, strip control characters, and enforce length and content rules.
///
/// Returns the cleaned text, or a visitor-safe reason string.
pub fn clean_message(raw: &str, max_len: usize) -> Result<String, String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    if cleaned.is_empty() {
        return Err("message is empty".into());
    }
    if cleaned.chars().count() > max_len {
        return Err(format!("message too long (maximum {max_len} characters)"));
    }
    if has_injection_payload(&cleaned) {
        return Err("message contains disallowed content".into());
    }

    Ok(cleaned)
}

/// Check for common markup-injection patterns: script tags, event-handler
/// attributes, the javascript: scheme, and iframes.
fn has_injection_payload(text: &str) -> bool {
    INJECTION_PATTERNS.iter().any(|re| re.is_match(text))
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_text() {
        assert_eq!(
            clean_message("  Do you offer hosting?  ", 1000).unwrap(),
            "Do you offer hosting?"
        );
    }

    #[test]
    fn keeps_newlines_strips_other_controls() {
        assert_eq!(
            clean_message("line one\nline two\u{0}\u{7}", 1000).unwrap(),
            "line one\nline two"
        );
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(clean_message("", 1000).is_err());
        assert!(clean_message("   \n ", 1000).is_err());
    }

    #[test]
    fn rejects_over_length() {
        let long = "x".repeat(1001);
        let err = clean_message(&long, 1000).unwrap_err();
        assert!(err.contains("too long"));
        assert!(clean_message(&"x".repeat(1000), 1000).is_ok());
    }

    #[test]
    fn rejects_script_tags() {
        assert!(clean_message("<script>alert(1)</script>", 1000).is_err());
        assert!(clean_message("<SCRIPT src=x>payload</SCRIPT>", 1000).is_err());
    }

    #[test]
    fn rejects_event_handlers_and_schemes() {
        assert!(clean_message("<img src=x onerror=alert(1)>", 1000).is_err());
        assert!(clean_message("click javascript:alert(1)", 1000).is_err());
        assert!(clean_message("<iframe src=evil.html>", 1000).is_err());
    }

    #[test]
    fn keyword_like_text_is_not_an_injection() {
        assert!(clean_message("what's your opinion on iframes?", 1000).is_ok());
        assert!(clean_message("I read about javascript yesterday", 1000).is_ok());
    }
}
