//! Key Pattern Module
//!
//! Wildcard patterns used by `invalidate`. `*` matches any substring and the
//! whole key must match.

use regex::Regex;
use tracing::warn;

// == Key Pattern ==
/// Compiled invalidation pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    /// None when neither translation compiled; such a pattern matches nothing
    regex: Option<Regex>,
}

impl KeyPattern {
    // == Compile ==
    /// Translates a glob into an anchored regex.
    ///
    /// Only `*` is rewritten; other characters keep their regex meaning.
    /// Patterns that do not compile that way are matched literally instead.
    pub fn new(pattern: &str) -> Self {
        let translated = format!("^{}$", pattern.replace('*', ".*"));
        let regex = match Regex::new(&translated) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!("Invalid cache pattern {:?} ({}), matching literally", pattern, err);
                literal_glob(pattern)
            }
        };
        Self { regex }
    }

    // == Matches ==
    pub fn matches(&self, key: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(key))
    }
}

/// Builds a regex where everything except `*` is escaped.
fn literal_glob(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).ok()
}
