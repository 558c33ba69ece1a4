//! Per-attribute redaction manifest.

use std::collections::BTreeMap;

/// The record of what a filter redacted and flattened while processing one attribute.
///
/// All paths are dotted, rooted at the original attribute key (`http.url.password`,
/// `body.user.name`). The `redacted` and `flattened` maps record values as observed during
/// parsing, before redaction; the replacement actually written into the re-encoded output is
/// tracked separately so that flattened leaves can be folded back into a span without ever
/// carrying a redacted original.
///
/// Manifests live only for the duration of one attribute's processing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedAttribute {
    redacted: BTreeMap<String, String>,
    flattened: BTreeMap<String, String>,
    replacements: BTreeMap<String, String>,
}

impl ParsedAttribute {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a leaf observed during structured parsing.
    ///
    /// Repeated records under the same path overwrite: the last value seen survives.
    pub fn record_flattened(&mut self, path: &str, value: &str) {
        self.flattened.insert(path.to_string(), value.to_string());
    }

    /// Records a leaf that was rewritten, keyed by path, along with the replacement written out.
    pub fn record_redacted(&mut self, path: &str, original: &str, replacement: &str) {
        self.redacted.insert(path.to_string(), original.to_string());
        self.replacements.insert(path.to_string(), replacement.to_string());
    }

    /// Returns the redacted leaves: path to original (pre-redaction) value.
    pub fn redacted(&self) -> &BTreeMap<String, String> {
        &self.redacted
    }

    /// Returns the flattened leaves: path to value observed during parsing.
    pub fn flattened(&self) -> &BTreeMap<String, String> {
        &self.flattened
    }

    /// Returns the replacement written out for the given path, if it was redacted.
    pub fn replacement(&self, path: &str) -> Option<&str> {
        self.replacements.get(path).map(String::as_str)
    }

    /// Returns `true` if any leaf was rewritten.
    pub fn has_redactions(&self) -> bool {
        !self.redacted.is_empty()
    }

    /// Returns `true` if nothing was redacted or flattened.
    pub fn is_empty(&self) -> bool {
        self.redacted.is_empty() && self.flattened.is_empty()
    }

    /// Iterates over the redacted paths, in sorted order.
    pub fn redacted_paths(&self) -> impl Iterator<Item = &str> {
        self.redacted.keys().map(String::as_str)
    }

    /// Folds another manifest into this one, overwriting on path collisions.
    pub fn merge(&mut self, other: ParsedAttribute) {
        self.redacted.extend(other.redacted);
        self.flattened.extend(other.flattened);
        self.replacements.extend(other.replacements);
    }
}
