//! Processor contract shared with the host pipeline.
//!
//! Processors are pure streaming transforms over span/metric batches: the host pipeline invokes
//! them from multiple worker contexts concurrently, each call carrying its own batch and request
//! context. Implementations are required to be stateless after construction.

use async_trait::async_trait;
use traceguard_error::GenericError;

use crate::data_model::metric::Metrics;
use crate::data_model::trace::Traces;

mod context;
mod manifest;

pub use self::context::{MetadataMap, RequestContext};
pub use self::manifest::ParsedAttribute;

/// A pipeline stage that transforms telemetry batches in place.
///
/// Batches are mutated through the given mutable reference so that a processor can report an
/// error while still leaving the work done so far visible to the host, which decides whether to
/// forward or drop the partially-processed batch.
#[async_trait]
pub trait Processor {
    /// Processes a batch of traces.
    ///
    /// # Errors
    ///
    /// If the batch cannot be processed (for example, the request context fails validation or
    /// processing is cancelled), an error is returned and the batch reflects the work completed
    /// before the failure.
    async fn process_traces(&self, ctx: &RequestContext, traces: &mut Traces) -> Result<(), GenericError>;

    /// Processes a batch of metrics.
    ///
    /// # Errors
    ///
    /// If the batch cannot be processed, an error is returned and the batch reflects the work
    /// completed before the failure.
    async fn process_metrics(&self, ctx: &RequestContext, metrics: &mut Metrics) -> Result<(), GenericError>;
}
