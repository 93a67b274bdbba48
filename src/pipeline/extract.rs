//! Coarse scan of body text for address-like substrings.
//!
//! The default pattern deliberately accepts octet groups outside 0-255.
//! Candidates are filtered afterwards by the strict parser in
//! [`crate::pipeline::address`].

use regex::Regex;

use crate::error::ConfigError;

/// Three dot-terminated groups of 1-3 digits and a final 1-3 digit group.
///
/// Digits and word boundaries are ASCII-only, so non-ASCII letters or digits
/// next to an address do not hide it.
pub const DOTTED_QUAD_PATTERN: &str = r"(?-u:\b)([0-9]{1,3}\.){3}[0-9]{1,3}(?-u:\b)";

/// Compiled extraction pattern.
#[derive(Debug, Clone)]
pub struct ExtractPattern {
    regex: Regex,
}

impl ExtractPattern {
    /// Compile a custom extraction pattern.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// The default dotted-quad pattern.
    pub fn dotted_quad() -> Self {
        Self {
            regex: Regex::new(DOTTED_QUAD_PATTERN).expect("dotted-quad pattern compiles"),
        }
    }

    /// All non-overlapping matches in `body`, in order of appearance.
    pub fn candidates<'a>(&'a self, body: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.regex.find_iter(body).map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(body: &str) -> Vec<String> {
        ExtractPattern::dotted_quad()
            .candidates(body)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn finds_candidates_in_order() {
        assert_eq!(
            scan("from 10.0.0.1 to 192.168.1.20 via 8.8.8.8"),
            vec!["10.0.0.1", "192.168.1.20", "8.8.8.8"]
        );
    }

    #[test]
    fn overmatches_out_of_range_octets() {
        assert_eq!(scan("bad 999.1.2.3 addr"), vec!["999.1.2.3"]);
    }

    #[test]
    fn ignores_short_and_empty_input() {
        assert!(scan("").is_empty());
        assert!(scan("version 1.2.3 only").is_empty());
        assert!(scan("1234.1.1.1").is_empty());
    }

    #[test]
    fn non_ascii_neighbours_do_not_hide_addresses() {
        assert_eq!(scan("接続元1.2.3.4から"), vec!["1.2.3.4"]);
        assert_eq!(scan("é1.2.3.4"), vec!["1.2.3.4"]);
        assert_eq!(scan("1.2.3.4٥"), vec!["1.2.3.4"]);
    }

    #[test]
    fn non_ascii_digits_are_not_octets() {
        assert!(scan("١.٢.٣.٤").is_empty());
    }

    #[test]
    fn custom_pattern() {
        let pattern = ExtractPattern::new(r"\bip=\S+").unwrap();
        let found: Vec<_> = pattern.candidates("ip=1.2.3.4 x").collect();
        assert_eq!(found, vec!["ip=1.2.3.4"]);
        assert!(ExtractPattern::new("(").is_err());
    }
}
