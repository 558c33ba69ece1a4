//! Request context.

use tokio_util::sync::CancellationToken;
use traceguard_common::collections::FastHashMap;

/// Transport metadata accompanying a batch, as a case-insensitive multimap of header values.
#[derive(Clone, Debug, Default)]
pub struct MetadataMap {
    entries: FastHashMap<String, Vec<String>>,
}

impl MetadataMap {
    /// Creates an empty metadata map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under the given header name.
    ///
    /// Header names are matched case-insensitively; repeated appends under the same name
    /// accumulate.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Returns all values recorded under the given header name.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns `true` if no headers are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-request state handed to a processor alongside a batch.
///
/// Carries the transport metadata the batch arrived with and the host's cancellation token.
/// Processors check the token at natural boundaries (between top-level attributes) and return
/// early when it fires.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    metadata: MetadataMap,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates a context with no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context carrying the given transport metadata.
    pub fn from_metadata(metadata: MetadataMap) -> Self {
        Self {
            metadata,
            cancellation: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns a reference to the transport metadata.
    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// Returns a reference to the cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` if the host has requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
