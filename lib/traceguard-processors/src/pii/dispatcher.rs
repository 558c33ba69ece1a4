//! Filter selection and composition.

use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_error::{generic_error, GenericError};

use super::filters::{
    Attribute, CookieFilter, Filter, FilterError, FilterOutcome, JsonFilter, KeyValueFilter, SqlFilter,
    UrlEncodedFilter,
};
use super::matcher::Matcher;

/// The encoding a dispatch rule routes to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FilterKind {
    Json,
    Sql,
    Cookie,
    UrlEncoded,
    KeyValue,
}

/// A configured dispatch rule for structured payloads.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ComplexDataConfig {
    #[serde(rename = "type")]
    kind: FilterKind,

    key: String,

    #[serde(default)]
    session: bool,
}

struct ComplexRule {
    key_pattern: Regex,
    kind: FilterKind,
    session: bool,
}

/// What the dispatcher produced for one attribute.
pub(crate) struct DispatchResult {
    pub outcome: FilterOutcome,
    pub error: Option<(&'static str, FilterError)>,
}

/// Routes attributes to filters by key pattern and content-type hint.
///
/// Configured complex-data rules are consulted first, in order; when none match, built-in
/// defaults apply. The selected filters run in sequence, each seeing the output of the previous
/// one. A structured filter that reports an unprocessable value falls back to the key-value
/// filter so top-level redaction is still attempted.
pub(crate) struct FilterDispatcher {
    complex_rules: Vec<ComplexRule>,
    key_value: KeyValueFilter,
    url_encoded: UrlEncodedFilter,
    json: JsonFilter,
    cookie: CookieFilter,
    sql: SqlFilter,
}

impl FilterDispatcher {
    pub fn new(matcher: Arc<Matcher>, complex_data: &[ComplexDataConfig]) -> Result<Self, GenericError> {
        let complex_rules = complex_data
            .iter()
            .map(|config| {
                Regex::new(&config.key)
                    .map(|key_pattern| ComplexRule {
                        key_pattern,
                        kind: config.kind,
                        session: config.session,
                    })
                    .map_err(|e| generic_error!("invalid complex data key pattern '{}': {}", config.key, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            complex_rules,
            key_value: KeyValueFilter::new(matcher.clone()),
            url_encoded: UrlEncodedFilter::new(matcher.clone()),
            json: JsonFilter::new(matcher.clone()),
            cookie: CookieFilter::new(matcher.clone()),
            sql: SqlFilter::new(matcher),
        })
    }

    /// Runs the filters selected for the given attribute, in order.
    pub fn run(&self, key: &str, value: &mut AttributeValue, content_type: Option<&str>) -> DispatchResult {
        let (kinds, session_scoped) = self.select(key, content_type);

        let mut merged = FilterOutcome::default();
        let mut error = None;

        for kind in kinds {
            let filter = self.filter_for(kind);
            match filter.redact_attribute(key, value) {
                Ok(outcome) => merge_outcome(&mut merged, outcome),
                Err(e) => {
                    debug!(
                        attribute = key,
                        filter = filter.name(),
                        error = %e,
                        "Attribute value unprocessable; falling back to key-value filter."
                    );
                    if kind != FilterKind::KeyValue {
                        if let Ok(fallback) = self.key_value.redact_attribute(key, value) {
                            merge_outcome(&mut merged, fallback);
                        }
                    }
                    error = Some((filter.name(), e));
                }
            }
        }

        // A session-scoped dispatch rule surfaces the (redacted) attribute value for correlation
        // when the selected filter itself did not identify a session.
        if session_scoped && merged.side_attribute.is_none() {
            let redacted_something = merged.manifest.as_ref().is_some_and(|m| m.has_redactions());
            if redacted_something {
                if let Some(current) = value.as_str() {
                    merged.side_attribute = Some(Attribute::session_id(current));
                }
            }
        }

        DispatchResult { outcome: merged, error }
    }

    fn select(&self, key: &str, content_type: Option<&str>) -> (Vec<FilterKind>, bool) {
        let mut kinds = Vec::new();
        let mut session = false;

        for rule in &self.complex_rules {
            if rule.key_pattern.is_match(key) && !kinds.contains(&rule.kind) {
                kinds.push(rule.kind);
                session |= rule.session;
            }
        }

        if kinds.is_empty() {
            kinds.push(default_kind(key, content_type));
        }

        (kinds, session)
    }

    fn filter_for(&self, kind: FilterKind) -> &dyn Filter {
        match kind {
            FilterKind::Json => &self.json,
            FilterKind::Sql => &self.sql,
            FilterKind::Cookie => &self.cookie,
            FilterKind::UrlEncoded => &self.url_encoded,
            FilterKind::KeyValue => &self.key_value,
        }
    }
}

fn merge_outcome(merged: &mut FilterOutcome, outcome: FilterOutcome) {
    match (&mut merged.manifest, outcome.manifest) {
        (Some(existing), Some(incoming)) => existing.merge(incoming),
        (None, Some(incoming)) => merged.manifest = Some(incoming),
        _ => {}
    }

    if merged.side_attribute.is_none() {
        merged.side_attribute = outcome.side_attribute;
    }
}

fn default_kind(key: &str, content_type: Option<&str>) -> FilterKind {
    match key {
        "http.url" => FilterKind::UrlEncoded,
        "http.request.body" | "http.response.body" => match content_type {
            Some(ct) if ct.contains("json") => FilterKind::Json,
            Some(ct) if ct.contains("x-www-form-urlencoded") => FilterKind::UrlEncoded,
            _ => FilterKind::KeyValue,
        },
        "http.request.header.cookie" | "http.response.header.set-cookie" => FilterKind::Cookie,
        "db.statement" | "sql.query" => FilterKind::Sql,
        _ => FilterKind::KeyValue,
    }
}
