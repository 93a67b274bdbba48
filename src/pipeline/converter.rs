//! Enrichment function and the per-run converter.

use tracing::trace;

use crate::config::TagConfig;
use crate::pipeline::address::{Address, ParseAddress, parse_address};
use crate::pipeline::extract::ExtractPattern;

/// Extracts candidates from body text and appends the ones that parse.
#[derive(Debug, Clone)]
pub struct AddressEnricher {
    pattern: ExtractPattern,
    parser: ParseAddress,
}

impl AddressEnricher {
    pub fn new(pattern: ExtractPattern, parser: ParseAddress) -> Self {
        Self { pattern, parser }
    }

    /// Dotted-quad scan followed by the strict 4-byte parser.
    pub fn dotted_quad() -> Self {
        Self::new(ExtractPattern::dotted_quad(), parse_address)
    }

    /// Append every valid address found in `body` to `found`, in order.
    /// Candidates that fail to parse are dropped.
    pub fn extend(&self, found: &mut Vec<Address>, body: &str) {
        for candidate in self.pattern.candidates(body) {
            match (self.parser)(candidate) {
                Ok(addr) => found.push(addr),
                Err(e) => trace!(error = %e, "Dropping address candidate"),
            }
        }
    }
}

/// Field configuration plus enrichment function, built once per run.
#[derive(Debug, Clone)]
pub struct Converter {
    pub config: TagConfig,
    pub enricher: AddressEnricher,
}

impl Converter {
    pub fn new(config: TagConfig, enricher: AddressEnricher) -> Self {
        Self { config, enricher }
    }

    /// Clear `found` and fill it with the addresses in `body`.
    pub fn add_addresses_from_body<'a>(
        &self,
        found: &'a mut Vec<Address>,
        body: &str,
    ) -> &'a [Address] {
        found.clear();
        self.enricher.extend(found, body);
        found
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(TagConfig::default(), AddressEnricher::dotted_quad())
    }
}

/// Append the canonical string form of each address to `tags`.
pub fn append_tags(tags: &mut Vec<String>, addresses: &[Address]) {
    tags.extend(addresses.iter().map(Address::to_string));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_valid_candidates_in_order() {
        let enricher = AddressEnricher::dotted_quad();
        let mut found = Vec::new();
        enricher.extend(&mut found, "a 1.2.3.4 b 999.0.0.1 c 10.0.0.255");
        assert_eq!(
            found,
            vec![Address::new([1, 2, 3, 4]), Address::new([10, 0, 0, 255])]
        );
    }

    #[test]
    fn extend_appends_to_existing() {
        let enricher = AddressEnricher::dotted_quad();
        let mut found = vec![Address::new([127, 0, 0, 1])];
        enricher.extend(&mut found, "8.8.4.4");
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].to_string(), "8.8.4.4");
    }

    #[test]
    fn converter_reuses_accumulator() {
        let converter = Converter::default();
        let mut found = Vec::with_capacity(8);
        let first = converter.add_addresses_from_body(&mut found, "1.1.1.1 2.2.2.2").len();
        assert_eq!(first, 2);

        let second = converter.add_addresses_from_body(&mut found, "3.3.3.3");
        assert_eq!(second, &[Address::new([3, 3, 3, 3])]);
        assert!(found.capacity() >= 8);
    }

    #[test]
    fn append_tags_uses_dotted_form() {
        let mut tags = vec!["a".to_string()];
        append_tags(&mut tags, &[Address::new([1, 2, 3, 4])]);
        assert_eq!(tags, vec!["a", "1.2.3.4"]);
    }
}
