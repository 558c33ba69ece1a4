//! Cookie filter.

use std::sync::Arc;

use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::processor::ParsedAttribute;

use super::{string_content, Attribute, Filter, FilterError, FilterOutcome};
use crate::pii::matcher::Matcher;

/// Parses the attribute as an HTTP cookie header (`name1=v1; name2=v2`).
///
/// Each cookie is evaluated like a key-value pair, with flattening: paths use
/// `key.cookieName`. Value-less segments (`Secure`, `HttpOnly`, ...) pass through untouched.
/// When anything is redacted the header is re-emitted with segments sorted by name, so repeated
/// processing yields a stable result.
pub struct CookieFilter {
    matcher: Arc<Matcher>,
}

enum Segment {
    Cookie { name: String, value: String },
    Flag(String),
}

impl CookieFilter {
    /// Creates a filter backed by the given matcher.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        Self { matcher }
    }
}

impl Filter for CookieFilter {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn redact_attribute(&self, key: &str, value: &mut AttributeValue) -> Result<FilterOutcome, FilterError> {
        let raw = match string_content(value) {
            Some(s) => s,
            None => return Ok(FilterOutcome::default()),
        };

        let mut segments = Vec::new();
        for part in raw.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((name, cookie_value)) => segments.push(Segment::Cookie {
                    name: name.trim().to_string(),
                    value: cookie_value.trim().to_string(),
                }),
                None => segments.push(Segment::Flag(part.to_string())),
            }
        }

        let mut manifest = ParsedAttribute::new();
        let mut side_attribute = None;

        for segment in &mut segments {
            let Segment::Cookie { name, value: cookie_value } = segment else {
                continue;
            };

            let fqn = format!("{}.{}", key, name);
            manifest.record_flattened(&fqn, cookie_value);

            let truncated_key = self.matcher.get_truncated_key(name);
            if let Some(key_match) = self.matcher.filter_key_regexs(truncated_key, cookie_value, "") {
                manifest.record_redacted(&fqn, cookie_value, &key_match.redacted);
                if key_match.session {
                    side_attribute = Some(Attribute::session_id(key_match.redacted.clone()));
                }
                *cookie_value = key_match.redacted;
            } else if let Some(rewritten) = self.matcher.filter_string_value_regexs(cookie_value) {
                manifest.record_redacted(&fqn, cookie_value, &rewritten);
                *cookie_value = rewritten;
            }
        }

        if manifest.has_redactions() {
            // Cookies first, sorted by name, then flags sorted by text.
            let mut cookies = Vec::new();
            let mut flags = Vec::new();
            for segment in segments {
                match segment {
                    Segment::Cookie { name, value } => cookies.push((name, value)),
                    Segment::Flag(flag) => flags.push(flag),
                }
            }
            cookies.sort();
            flags.sort();

            let mut parts: Vec<String> = cookies
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            parts.extend(flags);

            *value = AttributeValue::String(parts.join("; "));
        }

        Ok(FilterOutcome {
            manifest: Some(manifest),
            side_attribute,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::matcher::Rule;
    use crate::pii::redaction::Redactor;

    fn filter_with(key_rules: Vec<Rule>, value_rules: Vec<Rule>) -> CookieFilter {
        CookieFilter::new(Arc::new(Matcher::new(key_rules, value_rules, Vec::new()).unwrap()))
    }

    #[test]
    fn sensitive_cookie_redacted_and_flattened() {
        let filter = filter_with(vec![Rule::new("^password$", Redactor::Redact).unwrap()], Vec::new());

        let mut value = AttributeValue::from("name1=v1; password=hunter2");
        let outcome = filter
            .redact_attribute("http.request.header.cookie", &mut value)
            .unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(
            manifest.redacted().get("http.request.header.cookie.password").map(String::as_str),
            Some("hunter2")
        );
        assert_eq!(
            manifest.flattened().get("http.request.header.cookie.name1").map(String::as_str),
            Some("v1")
        );
        assert_eq!(value, AttributeValue::from("name1=v1; password=***"));
    }

    #[test]
    fn flags_pass_through() {
        let filter = filter_with(vec![Rule::new("^sid$", Redactor::Hash).unwrap()], Vec::new());

        let mut value = AttributeValue::from("sid=jdoe; Path=/; Secure; HttpOnly");
        let outcome = filter
            .redact_attribute("http.response.header.set-cookie", &mut value)
            .unwrap();

        let manifest = outcome.manifest.unwrap();
        assert!(manifest.has_redactions());
        assert_eq!(
            value,
            AttributeValue::from(
                "Path=/; sid=d30a5f57532a603697ccbb51558fa02ccadd74a0c499fcf9d45b33863ee1582f; HttpOnly; Secure"
            )
        );
    }

    #[test]
    fn value_rule_rewrites_cookie_value() {
        let filter = filter_with(Vec::new(), vec![Rule::new("^secret$", Redactor::Truncate).unwrap()]);

        let mut value = AttributeValue::from("a=secret; b=benign");
        let outcome = filter.redact_attribute("cookie", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.redacted().get("cookie.a").map(String::as_str), Some("secret"));
        assert_eq!(value, AttributeValue::from("a=s***t; b=benign"));
    }

    #[test]
    fn no_match_leaves_header_untouched() {
        let filter = filter_with(vec![Rule::new("^password$", Redactor::Redact).unwrap()], Vec::new());

        let mut value = AttributeValue::from("b=2; a=1");
        let outcome = filter.redact_attribute("cookie", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert!(!manifest.has_redactions());
        assert_eq!(manifest.flattened().len(), 2);
        // No redaction, so the original ordering is preserved.
        assert_eq!(value, AttributeValue::from("b=2; a=1"));
    }

    #[test]
    fn session_cookie_emits_side_attribute() {
        let filter = filter_with(
            vec![Rule::new("^jsessionid$", Redactor::Hash).unwrap().with_session(true)],
            Vec::new(),
        );

        let mut value = AttributeValue::from("jsessionid=jdoe");
        let outcome = filter.redact_attribute("cookie", &mut value).unwrap();

        let side = outcome.side_attribute.unwrap();
        assert_eq!(side.key, "session.id");
        assert_eq!(side.value, "d30a5f57532a603697ccbb51558fa02ccadd74a0c499fcf9d45b33863ee1582f");
    }

    #[test]
    fn empty_value_produces_nothing() {
        let filter = filter_with(vec![Rule::new("^password$", Redactor::Redact).unwrap()], Vec::new());

        let mut value = AttributeValue::from("");
        let outcome = filter.redact_attribute("cookie", &mut value).unwrap();
        assert!(outcome.manifest.is_none());
    }

    #[test]
    fn reprocessing_is_idempotent() {
        let filter = filter_with(vec![Rule::new("^password$", Redactor::Redact).unwrap()], Vec::new());

        let mut first = AttributeValue::from("z=9; password=hunter2; Secure");
        filter.redact_attribute("cookie", &mut first).unwrap();

        let mut second = first.clone();
        filter.redact_attribute("cookie", &mut second).unwrap();

        assert_eq!(first, second);
    }
}
