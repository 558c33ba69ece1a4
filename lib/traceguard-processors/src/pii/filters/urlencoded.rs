//! URL-encoded form filter.

use std::collections::BTreeMap;
use std::sync::Arc;

use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::processor::ParsedAttribute;
use url::{form_urlencoded, Url};

use super::{string_content, Attribute, Filter, FilterError, FilterOutcome};
use crate::pii::matcher::Matcher;

/// Attribute key treated as a full URL rather than a bare form.
const URL_ATTRIBUTE_KEY: &str = "http.url";

/// Parses the attribute as an `application/x-www-form-urlencoded` form.
///
/// When the attribute key is `http.url`, the value is parsed as a URL first and only the query
/// component is inspected and rewritten; path and host are preserved untouched.
///
/// Flattens each parameter under `key.param`. When a parameter appears multiple times, the last
/// value wins in both the flattened and redacted maps.
pub struct UrlEncodedFilter {
    matcher: Arc<Matcher>,
}

impl UrlEncodedFilter {
    /// Creates a filter backed by the given matcher.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        Self { matcher }
    }
}

impl Filter for UrlEncodedFilter {
    fn name(&self) -> &'static str {
        "urlencoded"
    }

    fn redact_attribute(&self, key: &str, value: &mut AttributeValue) -> Result<FilterOutcome, FilterError> {
        let raw = match string_content(value) {
            Some(s) => s,
            None => return Ok(FilterOutcome::default()),
        };

        let is_url_attr = key == URL_ATTRIBUTE_KEY;
        let mut parsed_url = None;
        let query = if is_url_attr {
            let url = Url::parse(raw).map_err(|e| FilterError::unprocessable(e.to_string()))?;
            let query = url.query().unwrap_or("").to_string();
            parsed_url = Some(url);
            query
        } else {
            raw.to_string()
        };

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (param, v) in form_urlencoded::parse(query.as_bytes()) {
            params.entry(param.into_owned()).or_default().push(v.into_owned());
        }

        let mut manifest = ParsedAttribute::new();
        let mut side_attribute = None;
        let mut rewritten: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (param, values) in &params {
            let fqn = format!("{}.{}", key, param);
            let multi_valued = values.len() > 1;
            let out = rewritten.entry(param.clone()).or_default();

            for (idx, v) in values.iter().enumerate() {
                manifest.record_flattened(&fqn, v);

                let path = if is_url_attr {
                    param.clone()
                } else if multi_valued {
                    format!("$.{}[{}]", param, idx)
                } else {
                    format!("$.{}", param)
                };

                if let Some(key_match) = self.matcher.filter_key_regexs(param, v, &path) {
                    manifest.record_redacted(&fqn, v, &key_match.redacted);
                    if key_match.session {
                        side_attribute = Some(Attribute::session_id(key_match.redacted.clone()));
                    }
                    out.push(key_match.redacted);
                } else if let Some(rewritten_value) = self.matcher.filter_string_value_regexs(v) {
                    manifest.record_redacted(&fqn, v, &rewritten_value);
                    out.push(rewritten_value);
                } else {
                    out.push(v.clone());
                }
            }
        }

        if manifest.has_redactions() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (param, values) in &rewritten {
                for v in values {
                    serializer.append_pair(param, v);
                }
            }
            let encoded = serializer.finish();

            let new_value = match parsed_url {
                Some(mut url) => {
                    url.set_query(Some(&encoded));
                    url.to_string()
                }
                None => encoded,
            };
            *value = AttributeValue::String(new_value);
        }

        Ok(FilterOutcome {
            manifest: Some(manifest),
            side_attribute,
        })
    }
}
