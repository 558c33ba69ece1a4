//! JSON filter.

use std::sync::Arc;

use serde_json::Value;
use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::processor::ParsedAttribute;

use super::{string_content, Attribute, Filter, FilterError, FilterOutcome};
use crate::pii::matcher::Matcher;

/// Parses the attribute as a JSON document and rewrites sensitive leaves.
///
/// Traversal is depth-first. At each leaf a JSONPath-like path is built (`$.a.b[2].c`); key-rules
/// are consulted against the leaf's member name (truncated), then value-rules against its string
/// value. Non-string leaves are traversed and flattened but never redacted. Array elements
/// inherit the member name of their enclosing array.
pub struct JsonFilter {
    matcher: Arc<Matcher>,
}

impl JsonFilter {
    /// Creates a filter backed by the given matcher.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        Self { matcher }
    }

    fn walk_value(
        &self, node: &mut Value, attr_key: &str, path: &str, member: Option<&str>, manifest: &mut ParsedAttribute,
        side_attribute: &mut Option<Attribute>,
    ) {
        match node {
            Value::Object(map) => {
                for (member_name, child) in map.iter_mut() {
                    let child_path = format!("{}.{}", path, member_name);
                    self.walk_value(child, attr_key, &child_path, Some(member_name.as_str()), manifest, side_attribute);
                }
            }
            Value::Array(elements) => {
                for (idx, child) in elements.iter_mut().enumerate() {
                    let child_path = format!("{}[{}]", path, idx);
                    self.walk_value(child, attr_key, &child_path, member, manifest, side_attribute);
                }
            }
            Value::String(leaf) => {
                let flattened_path = flattened_path(attr_key, path);
                manifest.record_flattened(&flattened_path, leaf);

                let key_match = member.and_then(|m| {
                    let truncated_key = self.matcher.get_truncated_key(m);
                    self.matcher.filter_key_regexs(truncated_key, leaf, path)
                });

                if let Some(key_match) = key_match {
                    manifest.record_redacted(&flattened_path, leaf, &key_match.redacted);
                    if key_match.session {
                        *side_attribute = Some(Attribute::session_id(key_match.redacted.clone()));
                    }
                    *leaf = key_match.redacted;
                } else if let Some(rewritten) = self.matcher.filter_string_value_regexs(leaf) {
                    manifest.record_redacted(&flattened_path, leaf, &rewritten);
                    *leaf = rewritten;
                }
            }
            leaf => {
                let flattened_path = flattened_path(attr_key, path);
                manifest.record_flattened(&flattened_path, &leaf.to_string());
            }
        }
    }
}

fn flattened_path(attr_key: &str, json_path: &str) -> String {
    let rest = json_path.strip_prefix('$').unwrap_or(json_path);
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    if rest.is_empty() {
        attr_key.to_string()
    } else {
        format!("{}.{}", attr_key, rest)
    }
}

impl Filter for JsonFilter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn redact_attribute(&self, key: &str, value: &mut AttributeValue) -> Result<FilterOutcome, FilterError> {
        let raw = match string_content(value) {
            Some(s) => s,
            None => return Ok(FilterOutcome::default()),
        };

        let mut document: Value =
            serde_json::from_str(raw).map_err(|e| FilterError::unprocessable(e.to_string()))?;

        let mut manifest = ParsedAttribute::new();
        let mut side_attribute = None;
        self.walk_value(&mut document, key, "$", None, &mut manifest, &mut side_attribute);

        if manifest.has_redactions() {
            let serialized =
                serde_json::to_string(&document).map_err(|e| FilterError::unprocessable(e.to_string()))?;
            *value = AttributeValue::String(serialized);
        }

        Ok(FilterOutcome {
            manifest: Some(manifest),
            side_attribute,
        })
    }
}
