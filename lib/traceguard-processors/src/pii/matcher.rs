//! Rule compilation and matching.
//!
//! The matcher is the single decision point for "does this leaf need redaction, and what is the
//! replacement". It is built once at processor construction, holds only compiled patterns, and is
//! safe to share across concurrent requests.

use regex::Regex;
use traceguard_error::{generic_error, GenericError};

use super::redaction::Redactor;

/// A compiled redaction rule: a pattern bound to a redaction strategy.
#[derive(Clone, Debug)]
pub struct Rule {
    pattern: Regex,
    redactor: Redactor,
    session: bool,
    fqn: bool,
}

impl Rule {
    /// Compiles a rule from the given pattern and strategy.
    ///
    /// # Errors
    ///
    /// If the pattern is not a valid regular expression, an error is returned.
    pub fn new(pattern: &str, redactor: Redactor) -> Result<Self, GenericError> {
        let compiled =
            Regex::new(pattern).map_err(|e| generic_error!("invalid rule pattern '{}': {}", pattern, e))?;

        Ok(Self {
            pattern: compiled,
            redactor,
            session: false,
            fqn: false,
        })
    }

    /// Marks matches of this rule as session identifiers.
    ///
    /// Only meaningful on key-rules; [`Matcher::new`] rejects session-flagged value-rules.
    pub fn with_session(mut self, session: bool) -> Self {
        self.session = session;
        self
    }

    /// Matches the pattern against the leaf's fully-qualified path instead of its truncated key.
    pub fn with_fqn_matching(mut self, fqn: bool) -> Self {
        self.fqn = fqn;
        self
    }
}

/// The result of a key-rule hit.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyMatch {
    /// Whether the matched rule identifies a session.
    pub session: bool,

    /// The replacement produced by the rule's strategy.
    pub redacted: String,
}

/// An ordered ruleset evaluated against (key, value, path) triples.
#[derive(Debug, Default)]
pub struct Matcher {
    key_rules: Vec<Rule>,
    value_rules: Vec<Rule>,
    key_prefixes: Vec<String>,
}

impl Matcher {
    /// Creates a matcher from compiled rules and known key prefixes.
    ///
    /// # Errors
    ///
    /// If a value-rule carries the session flag, an error is returned.
    pub fn new(
        key_rules: Vec<Rule>, value_rules: Vec<Rule>, key_prefixes: Vec<String>,
    ) -> Result<Self, GenericError> {
        if value_rules.iter().any(|r| r.session) {
            return Err(generic_error!("session identification is only valid on key rules"));
        }

        Ok(Self {
            key_rules,
            value_rules,
            key_prefixes,
        })
    }

    /// Evaluates the key-rules against the given key, in order. First match wins.
    ///
    /// Rules with FQN matching enabled are evaluated against `path` (when non-empty) instead of
    /// `truncated_key`. On a hit, the rule's strategy is applied to the whole value.
    pub fn filter_key_regexs(&self, truncated_key: &str, value: &str, path: &str) -> Option<KeyMatch> {
        for rule in &self.key_rules {
            let target = if rule.fqn && !path.is_empty() { path } else { truncated_key };
            if rule.pattern.is_match(target) {
                return Some(KeyMatch {
                    session: rule.session,
                    redacted: rule.redactor.apply(value),
                });
            }
        }

        None
    }

    /// Evaluates the value-rules against the given value, cumulatively and in order.
    ///
    /// Each match within the value is replaced by the rule's strategy applied to the matched
    /// substring only. Returns the rewritten value if at least one rule matched.
    pub fn filter_string_value_regexs(&self, value: &str) -> Option<String> {
        let mut current = value.to_string();
        let mut matched = false;

        for rule in &self.value_rules {
            if rule.pattern.is_match(&current) {
                current = rule
                    .pattern
                    .replace_all(&current, |caps: &regex::Captures<'_>| rule.redactor.apply(&caps[0]))
                    .into_owned();
                matched = true;
            }
        }

        matched.then_some(current)
    }

    /// Returns the key with the longest matching known prefix removed, or unchanged when no
    /// prefix matches.
    pub fn get_truncated_key<'a>(&self, key: &'a str) -> &'a str {
        self.key_prefixes
            .iter()
            .filter(|prefix| key.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .map(|prefix| &key[prefix.len()..])
            .unwrap_or(key)
    }
}
