//! Redaction strategies.

use serde::Deserialize;
use sha2::{Digest as _, Sha256};

/// The literal written in place of fully-redacted values.
pub const REDACTED_MARKER: &str = "***";

/// A value transform applied to a matched leaf.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Redactor {
    /// Replaces the value with the fixed `***` marker.
    #[default]
    #[serde(alias = "Redact")]
    Redact,

    /// Replaces the value with its SHA-256 digest, as lowercase hex.
    ///
    /// The digest is stable, so equal inputs can still be correlated downstream without exposing
    /// the original value.
    #[serde(alias = "Hash")]
    Hash,

    /// Elides the middle of the value, keeping the first and last character.
    #[serde(alias = "Truncate")]
    Truncate,
}

impl Redactor {
    /// Applies this strategy to the given value, producing the replacement.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Redact => REDACTED_MARKER.to_string(),
            Self::Hash => format!("{:x}", Sha256::digest(value.as_bytes())),
            Self::Truncate => truncate_middle(value),
        }
    }
}

fn truncate_middle(value: &str) -> String {
    let mut chars = value.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => format!("{}{}{}", first, REDACTED_MARKER, last),
        _ => REDACTED_MARKER.to_string(),
    }
}
