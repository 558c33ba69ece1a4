//! Leaf filters.
//!
//! One filter per supported encoding. Each consumes a string-valued attribute, parses it, walks
//! the leaves, consults the matcher, rewrites matched fragments in place, and reports a
//! [`ParsedAttribute`] manifest of what was redacted and flattened.

use snafu::Snafu;
use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::processor::ParsedAttribute;

mod cookie;
mod json;
mod keyvalue;
mod sql;
mod sql_tokenizer;
mod urlencoded;

pub use self::cookie::CookieFilter;
pub use self::json::JsonFilter;
pub use self::keyvalue::KeyValueFilter;
pub use self::sql::SqlFilter;
pub use self::urlencoded::UrlEncodedFilter;

/// Attribute key under which session identifiers are surfaced.
pub const SESSION_ID_KEY: &str = "session.id";

/// A filter error.
#[derive(Debug, Snafu)]
pub enum FilterError {
    /// The value could not be parsed by the selected filter.
    #[snafu(display("unprocessable value: {reason}"))]
    UnprocessableValue {
        /// Why parsing failed.
        reason: String,
    },
}

impl FilterError {
    pub(crate) fn unprocessable(reason: impl Into<String>) -> Self {
        Self::UnprocessableValue { reason: reason.into() }
    }
}

/// An additional attribute emitted alongside redaction, destined for the span's top level.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    /// Attribute key.
    pub key: String,

    /// Attribute value.
    pub value: String,
}

impl Attribute {
    /// Creates a `session.id` attribute carrying the given (already redacted) value.
    pub fn session_id(value: impl Into<String>) -> Self {
        Self {
            key: SESSION_ID_KEY.to_string(),
            value: value.into(),
        }
    }
}

/// What a filter produced for one attribute.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// The manifest, when the filter parsed or rewrote the value.
    ///
    /// Flattening filters produce a manifest (possibly with nothing redacted) whenever parsing
    /// succeeds; the key-value filter produces one only when a rule fired.
    pub manifest: Option<ParsedAttribute>,

    /// A side attribute to surface at the span's top level (e.g. `session.id`).
    pub side_attribute: Option<Attribute>,
}

impl FilterOutcome {
    /// Creates an outcome carrying only a manifest.
    pub fn from_manifest(manifest: ParsedAttribute) -> Self {
        Self {
            manifest: Some(manifest),
            side_attribute: None,
        }
    }
}

/// A leaf filter over one attribute encoding.
pub trait Filter {
    /// Returns the filter name, for diagnostics and manifest provenance.
    fn name(&self) -> &'static str;

    /// Inspects and possibly rewrites the given attribute value in place.
    ///
    /// Empty or non-string values produce an empty outcome.
    ///
    /// # Errors
    ///
    /// If the value cannot be parsed by this filter's encoding, an error is returned and the
    /// value is left untouched.
    fn redact_attribute(&self, key: &str, value: &mut AttributeValue) -> Result<FilterOutcome, FilterError>;
}

/// Extracts the non-empty string content of an attribute value, if any.
fn string_content(value: &AttributeValue) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}
