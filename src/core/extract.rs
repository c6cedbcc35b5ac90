//! Field extraction - pull a single value out of a text file with a regex
//!
//! Patterns come straight from the workflow config, so a bad pattern is
//! treated like a pattern that does not match.

use regex::RegexBuilder;

/// Apply `pattern` case-insensitively and return the trimmed first capture
/// group, or `None` when the pattern is invalid, has no group, or misses.
pub fn extract(text: &str, pattern: &str) -> Option<String> {
    if pattern.is_empty() {
        return None;
    }

    let re = match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            log::debug!("Ignoring invalid field pattern {:?}: {}", pattern, e);
            return None;
        }
    };

    let value = re.captures(text)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
