//! PII redaction processor.
//!
//! Inspects every span attribute and span-event attribute, identifies sensitive data via
//! configurable pattern matching, decodes nested encodings (URL-encoded forms, JSON, cookies,
//! SQL), redacts matched fragments in place, and annotates the span with what was redacted and
//! flattened. Metrics pass through untouched.

mod dispatcher;
pub mod filters;
pub mod matcher;
pub mod redaction;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use traceguard_config::GenericConfiguration;
use traceguard_core::data_model::attribute::{AttributeMap, AttributeValue};
use traceguard_core::data_model::metric::Metrics;
use traceguard_core::data_model::trace::{Span, Traces};
use traceguard_core::processor::{Processor, RequestContext};
use traceguard_error::{generic_error, GenericError};

use self::dispatcher::{ComplexDataConfig, FilterDispatcher};
use self::filters::Attribute;
use self::matcher::{Matcher, Rule};
use self::redaction::Redactor;

/// Span attribute that accumulates per-attribute filter failures.
const REDACTION_ERRORS_KEY: &str = "redaction.errors";

/// Suffix appended to an attribute key to list its redacted sub-paths.
const REDACTED_KEYS_SUFFIX: &str = ".redacted_keys";

const REQUEST_CONTENT_TYPE_KEY: &str = "http.request.header.content-type";
const RESPONSE_CONTENT_TYPE_KEY: &str = "http.response.header.content-type";

/// PII filter configuration.
#[derive(Default, Deserialize)]
pub struct PiiFilterConfiguration {
    #[serde(default)]
    prefixes: Vec<String>,

    #[serde(default, alias = "keyRegExs")]
    key_regexs: Vec<KeyRegexConfig>,

    #[serde(default, alias = "valueRegExs")]
    value_regexs: Vec<ValueRegexConfig>,

    #[serde(default, alias = "complexData")]
    complex_data: Vec<ComplexDataConfig>,
}

#[derive(Clone, Debug, Deserialize)]
struct KeyRegexConfig {
    regex: String,

    #[serde(default)]
    redactor: Redactor,

    #[serde(default, alias = "sessionIdentifier")]
    session_identifier: bool,

    #[serde(default)]
    fqn: bool,
}

#[derive(Clone, Debug, Deserialize)]
struct ValueRegexConfig {
    regex: String,

    #[serde(default)]
    redactor: Redactor,
}

impl PiiFilterConfiguration {
    /// Creates a `PiiFilterConfiguration` from the given generic configuration.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        Ok(config.as_typed()?)
    }

    /// Builds the processor, compiling all rules.
    ///
    /// # Errors
    ///
    /// If a pattern fails to compile, an error is returned. Rule compilation failures are fatal
    /// configuration errors.
    pub fn build(&self) -> Result<PiiFilterProcessor, GenericError> {
        let key_rules = self
            .key_regexs
            .iter()
            .map(|config| {
                Rule::new(&config.regex, config.redactor)
                    .map(|rule| rule.with_session(config.session_identifier).with_fqn_matching(config.fqn))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let value_rules = self
            .value_regexs
            .iter()
            .map(|config| Rule::new(&config.regex, config.redactor))
            .collect::<Result<Vec<_>, _>>()?;

        let matcher = Arc::new(Matcher::new(key_rules, value_rules, self.prefixes.clone())?);
        let dispatcher = FilterDispatcher::new(matcher, &self.complex_data)?;

        Ok(PiiFilterProcessor { dispatcher })
    }
}

/// The PII redaction pipeline stage.
///
/// Stateless after construction: the compiled ruleset is read-only and the processor holds no
/// per-request state, so a single instance serves concurrent batches.
pub struct PiiFilterProcessor {
    dispatcher: FilterDispatcher,
}

#[derive(Default)]
struct SpanScratch {
    side_attributes: Vec<Attribute>,
    errors: Vec<String>,
}

impl PiiFilterProcessor {
    fn process_span(&self, span: &mut Span, ctx: &RequestContext) -> Result<(), GenericError> {
        let mut scratch = SpanScratch::default();

        let result = self
            .process_attribute_map(span.attributes_mut(), &mut scratch, ctx)
            .and_then(|()| {
                span.events_mut()
                    .iter_mut()
                    .try_for_each(|event| self.process_attribute_map(event.attributes_mut(), &mut scratch, ctx))
            });

        // Side attributes and error markers still land on partially-processed spans.
        for attribute in scratch.side_attributes {
            span.attributes_mut()
                .entry(attribute.key)
                .or_insert_with(|| AttributeValue::String(attribute.value));
        }

        if !scratch.errors.is_empty() {
            scratch.errors.sort();
            scratch.errors.dedup();
            span.attributes_mut().insert(
                REDACTION_ERRORS_KEY.to_string(),
                AttributeValue::String(scratch.errors.join(",")),
            );
        }

        result
    }

    fn process_attribute_map(
        &self, attributes: &mut AttributeMap, scratch: &mut SpanScratch, ctx: &RequestContext,
    ) -> Result<(), GenericError> {
        // The host map is unordered; a sorted snapshot keeps the observable output stable when a
        // flattened path collides with a not-yet-processed attribute key.
        let mut keys: Vec<String> = attributes.keys().cloned().collect();
        keys.sort();

        for key in keys {
            if ctx.is_cancelled() {
                return Err(generic_error!("redaction cancelled before batch completion"));
            }

            if is_synthetic_key(&key) {
                continue;
            }

            let content_type = content_type_hint(&key, attributes);
            let Some(value) = attributes.get_mut(&key) else {
                continue;
            };
            if !value.is_string() {
                continue;
            }

            let result = self.dispatcher.run(&key, value, content_type.as_deref());

            if let Some((filter_name, error)) = result.error {
                debug!(attribute = %key, filter = filter_name, error = %error, "Attribute left unprocessed.");
                scratch.errors.push(format!("{}:{}", key, filter_name));
            }

            if let Some(side_attribute) = result.outcome.side_attribute {
                scratch.side_attributes.push(side_attribute);
            }

            if let Some(manifest) = result.outcome.manifest {
                for (path, observed) in manifest.flattened() {
                    if path.as_str() == key {
                        continue;
                    }
                    let merged = manifest.replacement(path).unwrap_or(observed.as_str());
                    attributes.insert(path.clone(), AttributeValue::String(merged.to_string()));
                }

                if manifest.has_redactions() {
                    let paths = manifest.redacted_paths().collect::<Vec<_>>().join(",");
                    attributes.insert(
                        format!("{}{}", key, REDACTED_KEYS_SUFFIX),
                        AttributeValue::String(paths),
                    );
                }
            }
        }

        Ok(())
    }
}

fn is_synthetic_key(key: &str) -> bool {
    key == REDACTION_ERRORS_KEY || key == filters::SESSION_ID_KEY || key.ends_with(REDACTED_KEYS_SUFFIX)
}

fn content_type_hint(key: &str, attributes: &AttributeMap) -> Option<String> {
    let hint_key = if key.starts_with("http.response.") {
        RESPONSE_CONTENT_TYPE_KEY
    } else {
        REQUEST_CONTENT_TYPE_KEY
    };

    attributes.get(hint_key).and_then(|v| v.as_str()).map(str::to_string)
}

#[async_trait]
impl Processor for PiiFilterProcessor {
    async fn process_traces(&self, ctx: &RequestContext, traces: &mut Traces) -> Result<(), GenericError> {
        for span in traces.spans_mut() {
            self.process_span(span, ctx)?;
        }
        Ok(())
    }

    async fn process_metrics(&self, _ctx: &RequestContext, _metrics: &mut Metrics) -> Result<(), GenericError> {
        // Metric names and values carry no free-form payloads; the batch passes through as-is.
        Ok(())
    }
}
