//! SQL filter.

use std::sync::Arc;

use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::processor::ParsedAttribute;

use super::sql_tokenizer::{SqlTokenizer, Token, TokenKind};
use super::{string_content, Attribute, Filter, FilterError, FilterOutcome};
use crate::pii::matcher::Matcher;

/// Parses the attribute as SQL and redacts sensitive literal values.
///
/// String and numeric literals are checked against value-rules. A literal on the right-hand side
/// of a comparison (`identifier = literal`, `identifier LIKE literal`, `identifier IN (...)`) is
/// additionally checked against key-rules via the identifier. The emitted statement preserves
/// structure with matched literals replaced in place.
///
/// Does not flatten; redacted literals are recorded under the attribute key itself, last write
/// wins when multiple literals match.
pub struct SqlFilter {
    matcher: Arc<Matcher>,
}

impl SqlFilter {
    /// Creates a filter backed by the given matcher.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        Self { matcher }
    }
}

impl Filter for SqlFilter {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn redact_attribute(&self, key: &str, value: &mut AttributeValue) -> Result<FilterOutcome, FilterError> {
        let raw = match string_content(value) {
            Some(s) => s.to_string(),
            None => return Ok(FilterOutcome::default()),
        };

        let mut tokenizer = SqlTokenizer::new(&raw);
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            match tokenizer.scan() {
                Ok(Some(token)) => tokens.push(token),
                Ok(None) => break,
                Err(reason) => return Err(FilterError::unprocessable(reason)),
            }
        }

        let mut manifest = ParsedAttribute::new();
        let mut side_attribute = None;
        let mut splices: Vec<(usize, usize, String)> = Vec::new();

        // The identifier most recently seen, and the one armed as the key for the next literal
        // once a comparison operator shows up.
        let mut prev_identifier: Option<(usize, usize)> = None;
        let mut pending_key: Option<(usize, usize)> = None;

        for token in &tokens {
            match token.kind {
                TokenKind::Identifier => {
                    let text = &raw[token.start..token.end];
                    if text.eq_ignore_ascii_case("like") || text.eq_ignore_ascii_case("in") {
                        pending_key = prev_identifier;
                    } else {
                        prev_identifier = Some((token.start, token.end));
                    }
                }
                TokenKind::QuotedIdentifier => {
                    // Range excludes the surrounding quotes.
                    prev_identifier = Some((token.start + 1, token.end - 1));
                }
                TokenKind::Operator => {
                    let text = &raw[token.start..token.end];
                    if matches!(text, "=" | "<" | ">") {
                        pending_key = prev_identifier;
                    }
                }
                TokenKind::StringLiteral => {
                    let literal = &raw[token.start + 1..token.end - 1];
                    if let Some(replacement) =
                        self.redact_literal(key, literal, pending_key.map(|(s, e)| &raw[s..e]), &mut manifest, &mut side_attribute)
                    {
                        splices.push((token.start + 1, token.end - 1, replacement));
                    }
                    pending_key = None;
                    prev_identifier = None;
                }
                TokenKind::NumberLiteral => {
                    let literal = &raw[token.start..token.end];
                    if let Some(replacement) =
                        self.redact_literal(key, literal, pending_key.map(|(s, e)| &raw[s..e]), &mut manifest, &mut side_attribute)
                    {
                        splices.push((token.start, token.end, replacement));
                    }
                    pending_key = None;
                    prev_identifier = None;
                }
                TokenKind::Punctuation => {}
            }
        }

        if !splices.is_empty() {
            let mut output = raw;
            for (start, end, replacement) in splices.iter().rev() {
                output.replace_range(*start..*end, replacement);
            }
            *value = AttributeValue::String(output);
        }

        Ok(FilterOutcome {
            manifest: manifest.has_redactions().then_some(manifest),
            side_attribute,
        })
    }
}

impl SqlFilter {
    fn redact_literal(
        &self, attr_key: &str, literal: &str, pending_key: Option<&str>, manifest: &mut ParsedAttribute,
        side_attribute: &mut Option<Attribute>,
    ) -> Option<String> {
        if let Some(identifier) = pending_key {
            let truncated_key = self.matcher.get_truncated_key(identifier);
            if let Some(key_match) = self.matcher.filter_key_regexs(truncated_key, literal, "") {
                manifest.record_redacted(attr_key, literal, &key_match.redacted);
                if key_match.session {
                    *side_attribute = Some(Attribute::session_id(key_match.redacted.clone()));
                }
                return Some(key_match.redacted);
            }
        }

        if let Some(rewritten) = self.matcher.filter_string_value_regexs(literal) {
            manifest.record_redacted(attr_key, literal, &rewritten);
            return Some(rewritten);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::matcher::Rule;
    use crate::pii::redaction::Redactor;

    fn filter_with(key_rules: Vec<Rule>, value_rules: Vec<Rule>) -> SqlFilter {
        SqlFilter::new(Arc::new(Matcher::new(key_rules, value_rules, Vec::new()).unwrap()))
    }

    fn password_filter() -> SqlFilter {
        filter_with(vec![Rule::new("^password$", Redactor::Redact).unwrap()], Vec::new())
    }

    #[test]
    fn key_rule_redacts_compared_literal() {
        let filter = password_filter();

        let mut value = AttributeValue::from("SELECT * FROM users WHERE password = 'hunter2'");
        let outcome = filter.redact_attribute("db.statement", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.redacted().get("db.statement").map(String::as_str), Some("hunter2"));
        assert_eq!(
            value,
            AttributeValue::from("SELECT * FROM users WHERE password = '***'")
        );
    }

    #[test]
    fn key_rule_applies_through_like() {
        let filter = filter_with(vec![Rule::new("^ssn$", Redactor::Redact).unwrap()], Vec::new());

        let mut value = AttributeValue::from("SELECT id FROM people WHERE ssn LIKE '123%'");
        filter.redact_attribute("db.statement", &mut value).unwrap();

        assert_eq!(
            value,
            AttributeValue::from("SELECT id FROM people WHERE ssn LIKE '***'")
        );
    }

    #[test]
    fn quoted_identifier_consulted_against_key_rules() {
        let filter = password_filter();

        let mut value = AttributeValue::from(r#"SELECT * FROM t WHERE "password" = 'x'"#);
        filter.redact_attribute("db.statement", &mut value).unwrap();

        assert_eq!(
            value,
            AttributeValue::from(r#"SELECT * FROM t WHERE "password" = '***'"#)
        );
    }

    #[test]
    fn value_rule_redacts_literals_anywhere() {
        let filter = filter_with(
            Vec::new(),
            vec![Rule::new("^[0-9]{3}-[0-9]{2}-[0-9]{4}$", Redactor::Redact).unwrap()],
        );

        let mut value = AttributeValue::from("INSERT INTO people (ssn) VALUES ('123-45-6789')");
        let outcome = filter.redact_attribute("db.statement", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(
            manifest.redacted().get("db.statement").map(String::as_str),
            Some("123-45-6789")
        );
        assert_eq!(
            value,
            AttributeValue::from("INSERT INTO people (ssn) VALUES ('***')")
        );
    }

    #[test]
    fn numeric_literal_redacted_by_key_rule() {
        let filter = filter_with(vec![Rule::new("^pin$", Redactor::Redact).unwrap()], Vec::new());

        let mut value = AttributeValue::from("SELECT * FROM cards WHERE pin = 1234 AND active = 1");
        let outcome = filter.redact_attribute("db.statement", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.redacted().get("db.statement").map(String::as_str), Some("1234"));
        assert_eq!(
            value,
            AttributeValue::from("SELECT * FROM cards WHERE pin = *** AND active = 1")
        );
    }

    #[test]
    fn multiple_literals_last_write_wins_in_manifest() {
        let filter = password_filter();

        let mut value =
            AttributeValue::from("SELECT 1 WHERE password = 'first' OR password = 'second'");
        let outcome = filter.redact_attribute("db.statement", &mut value).unwrap();

        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.redacted().get("db.statement").map(String::as_str), Some("second"));
        assert_eq!(
            value,
            AttributeValue::from("SELECT 1 WHERE password = '***' OR password = '***'")
        );
    }

    #[test]
    fn no_match_produces_no_manifest() {
        let filter = password_filter();

        let mut value = AttributeValue::from("SELECT name FROM users WHERE id = 7");
        let outcome = filter.redact_attribute("db.statement", &mut value).unwrap();

        assert!(outcome.manifest.is_none());
        assert_eq!(
            value,
            AttributeValue::from("SELECT name FROM users WHERE id = 7")
        );
    }

    #[test]
    fn unparseable_sql_is_unprocessable() {
        let filter = password_filter();

        let mut value = AttributeValue::from("SELECT 'unterminated");
        let result = filter.redact_attribute("db.statement", &mut value);

        assert!(matches!(result, Err(FilterError::UnprocessableValue { .. })));
        assert_eq!(value, AttributeValue::from("SELECT 'unterminated"));
    }

    #[test]
    fn comments_do_not_disturb_redaction() {
        let filter = password_filter();

        let mut value = AttributeValue::from("-- check login\nSELECT * FROM t WHERE password = 'x'");
        filter.redact_attribute("db.statement", &mut value).unwrap();

        assert_eq!(
            value,
            AttributeValue::from("-- check login\nSELECT * FROM t WHERE password = '***'")
        );
    }

    #[test]
    fn session_rule_emits_side_attribute() {
        let filter = filter_with(
            vec![Rule::new("^session_token$", Redactor::Hash).unwrap().with_session(true)],
            Vec::new(),
        );

        let mut value = AttributeValue::from("SELECT * FROM s WHERE session_token = 'jdoe'");
        let outcome = filter.redact_attribute("db.statement", &mut value).unwrap();

        let side = outcome.side_attribute.unwrap();
        assert_eq!(side.key, "session.id");
        assert_eq!(side.value, "d30a5f57532a603697ccbb51558fa02ccadd74a0c499fcf9d45b33863ee1582f");
    }

    #[test]
    fn reprocessing_is_idempotent() {
        let filter = password_filter();

        let mut first = AttributeValue::from("SELECT * FROM users WHERE password = 'hunter2'");
        filter.redact_attribute("db.statement", &mut first).unwrap();

        let mut second = first.clone();
        filter.redact_attribute("db.statement", &mut second).unwrap();

        assert_eq!(first, second);
    }
}
