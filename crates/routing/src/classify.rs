//! Keyword classification.
//!
//! A message qualifies for automation when it contains any configured
//! keyword as a case-insensitive substring. First match wins; there is no
//! ranking. Pure function of configuration and text.

/// Return the first keyword contained in `text`, if any.
pub fn matching_keyword<'a>(keywords: &'a [String], text: &str) -> Option<&'a str> {
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .find(|k| lowered.contains(&k.to_lowercase()))
        .map(|k| k as &str)
}
