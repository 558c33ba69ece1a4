//! Key-value filter.

use std::sync::Arc;

use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::processor::ParsedAttribute;

use super::{string_content, Attribute, Filter, FilterError, FilterOutcome};
use crate::pii::matcher::Matcher;

/// Treats the attribute as a single (key, value) pair.
///
/// The fallback filter for attributes with no structured encoding: key-rules are consulted
/// against the (truncated) attribute key, then value-rules against the value. Does not flatten.
pub struct KeyValueFilter {
    matcher: Arc<Matcher>,
}

impl KeyValueFilter {
    /// Creates a filter backed by the given matcher.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        Self { matcher }
    }
}

impl Filter for KeyValueFilter {
    fn name(&self) -> &'static str {
        "key-value"
    }

    fn redact_attribute(&self, key: &str, value: &mut AttributeValue) -> Result<FilterOutcome, FilterError> {
        let current = match string_content(value) {
            Some(s) => s.to_string(),
            None => return Ok(FilterOutcome::default()),
        };

        let truncated_key = self.matcher.get_truncated_key(key);
        if let Some(key_match) = self.matcher.filter_key_regexs(truncated_key, &current, "") {
            let mut manifest = ParsedAttribute::new();
            manifest.record_redacted(key, &current, &key_match.redacted);

            let side_attribute = key_match
                .session
                .then(|| Attribute::session_id(key_match.redacted.clone()));

            *value = AttributeValue::String(key_match.redacted);
            return Ok(FilterOutcome {
                manifest: Some(manifest),
                side_attribute,
            });
        }

        if let Some(rewritten) = self.matcher.filter_string_value_regexs(&current) {
            let mut manifest = ParsedAttribute::new();
            manifest.record_redacted(key, &current, &rewritten);

            *value = AttributeValue::String(rewritten);
            return Ok(FilterOutcome::from_manifest(manifest));
        }

        Ok(FilterOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::matcher::Rule;
    use crate::pii::redaction::Redactor;

    fn filter_with(key_rules: Vec<Rule>, value_rules: Vec<Rule>, prefixes: Vec<String>) -> KeyValueFilter {
        KeyValueFilter::new(Arc::new(Matcher::new(key_rules, value_rules, prefixes).unwrap()))
    }

    #[test]
    fn empty_value_produces_nothing() {
        let filter = filter_with(
            vec![Rule::new("^password$", Redactor::Redact).unwrap()],
            Vec::new(),
            Vec::new(),
        );

        let mut value = AttributeValue::from("");
        let outcome = filter.redact_attribute("password", &mut value).unwrap();
        assert!(outcome.manifest.is_none());
        assert!(outcome.side_attribute.is_none());
        assert_eq!(value, AttributeValue::from(""));
    }

    #[test]
    fn key_match_redacts_whole_value() {
        let filter = filter_with(
            vec![Rule::new("^password$", Redactor::Redact).unwrap()],
            Vec::new(),
            Vec::new(),
        );

        let mut value = AttributeValue::from("hunter2");
        let outcome = filter.redact_attribute("password", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.redacted().get("password").map(String::as_str), Some("hunter2"));
        assert!(manifest.flattened().is_empty());
        assert_eq!(value, AttributeValue::from("***"));
    }

    #[test]
    fn key_match_uses_truncated_key() {
        let filter = filter_with(
            vec![Rule::new("^authorization$", Redactor::Redact).unwrap()],
            Vec::new(),
            vec!["http.request.header.".to_string()],
        );

        let mut value = AttributeValue::from("Bearer abc123");
        let outcome = filter
            .redact_attribute("http.request.header.authorization", &mut value)
            .unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(
            manifest.redacted().get("http.request.header.authorization").map(String::as_str),
            Some("Bearer abc123")
        );
        assert_eq!(value, AttributeValue::from("***"));
    }

    #[test]
    fn session_rule_emits_side_attribute() {
        let filter = filter_with(
            vec![Rule::new("^session_token$", Redactor::Hash).unwrap().with_session(true)],
            Vec::new(),
            Vec::new(),
        );

        let mut value = AttributeValue::from("jdoe");
        let outcome = filter.redact_attribute("session_token", &mut value).unwrap();

        let side = outcome.side_attribute.unwrap();
        assert_eq!(side.key, "session.id");
        assert_eq!(side.value, "d30a5f57532a603697ccbb51558fa02ccadd74a0c499fcf9d45b33863ee1582f");
        assert_eq!(value.as_str(), Some(side.value.as_str()));
    }

    #[test]
    fn value_match_rewrites_fragments() {
        let filter = filter_with(
            Vec::new(),
            vec![Rule::new("[0-9]{3}-[0-9]{2}-[0-9]{4}", Redactor::Redact).unwrap()],
            Vec::new(),
        );

        let mut value = AttributeValue::from("ssn=123-45-6789");
        let outcome = filter.redact_attribute("note", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.redacted().get("note").map(String::as_str), Some("ssn=123-45-6789"));
        assert_eq!(value, AttributeValue::from("ssn=***"));
    }

    #[test]
    fn key_match_wins_over_value_match() {
        let filter = filter_with(
            vec![Rule::new("^password$", Redactor::Redact).unwrap()],
            vec![Rule::new("hunter", Redactor::Truncate).unwrap()],
            Vec::new(),
        );

        let mut value = AttributeValue::from("hunter2");
        filter.redact_attribute("password", &mut value).unwrap();
        assert_eq!(value, AttributeValue::from("***"));
    }

    #[test]
    fn no_match_leaves_value_untouched() {
        let filter = filter_with(
            vec![Rule::new("^password$", Redactor::Redact).unwrap()],
            Vec::new(),
            Vec::new(),
        );

        let mut value = AttributeValue::from("dave");
        let outcome = filter.redact_attribute("user", &mut value).unwrap();
        assert!(outcome.manifest.is_none());
        assert_eq!(value, AttributeValue::from("dave"));
    }

    #[test]
    fn non_string_value_ignored() {
        let filter = filter_with(
            vec![Rule::new("^password$", Redactor::Redact).unwrap()],
            Vec::new(),
            Vec::new(),
        );

        let mut value = AttributeValue::from(42_i64);
        let outcome = filter.redact_attribute("password", &mut value).unwrap();
        assert!(outcome.manifest.is_none());
        assert_eq!(value, AttributeValue::from(42_i64));
    }
}
