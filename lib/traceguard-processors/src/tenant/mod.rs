//! Tenant-ID stamping processor.
//!
//! Extracts a caller-supplied tenant identifier from transport metadata and stamps it onto every
//! span attribute map and every metric datapoint label map. Header validation is an
//! authorization boundary: a missing or ambiguous header rejects the whole batch.

use async_trait::async_trait;
use serde::Deserialize;
use snafu::Snafu;
use tracing::debug;
use traceguard_config::GenericConfiguration;
use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::data_model::metric::Metrics;
use traceguard_core::data_model::trace::Traces;
use traceguard_core::processor::{Processor, RequestContext};
use traceguard_error::{generic_error, GenericError};

/// Default transport header carrying the tenant identifier.
pub const DEFAULT_HEADER_NAME: &str = "x-tenant-id";

/// Default attribute/label key the tenant identifier is stamped under.
pub const DEFAULT_ATTRIBUTE_KEY: &str = "tenant-id";

/// A tenant header validation error.
#[derive(Debug, Snafu)]
pub enum TenantError {
    /// The configured header was absent or empty.
    #[snafu(display("missing header: {header_name}"))]
    MissingHeader {
        /// The header that was expected.
        header_name: String,
    },

    /// The configured header appeared more than once.
    #[snafu(display("multiple tenant ID headers: {header_name} appeared {count} times"))]
    MultipleHeaders {
        /// The ambiguous header.
        header_name: String,

        /// How many values were present.
        count: usize,
    },
}

/// Tenant-ID processor configuration.
#[derive(Deserialize)]
pub struct TenantIdConfiguration {
    #[serde(default = "default_header_name")]
    tenant_id_header_name: String,

    #[serde(default = "default_attribute_key")]
    tenant_id_attribute_key: String,
}

fn default_header_name() -> String {
    DEFAULT_HEADER_NAME.to_string()
}

fn default_attribute_key() -> String {
    DEFAULT_ATTRIBUTE_KEY.to_string()
}

impl Default for TenantIdConfiguration {
    fn default() -> Self {
        Self {
            tenant_id_header_name: default_header_name(),
            tenant_id_attribute_key: default_attribute_key(),
        }
    }
}

impl TenantIdConfiguration {
    /// Creates a `TenantIdConfiguration` from the given generic configuration.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        Ok(config.as_typed()?)
    }

    /// Builds the processor.
    ///
    /// # Errors
    ///
    /// If the configured header name or attribute key is empty, an error is returned.
    pub fn build(&self) -> Result<TenantIdProcessor, GenericError> {
        if self.tenant_id_header_name.is_empty() {
            return Err(generic_error!("tenant ID header name must not be empty"));
        }
        if self.tenant_id_attribute_key.is_empty() {
            return Err(generic_error!("tenant ID attribute key must not be empty"));
        }

        Ok(TenantIdProcessor {
            header_name: self.tenant_id_header_name.clone(),
            attribute_key: self.tenant_id_attribute_key.clone(),
        })
    }
}

/// The tenant-ID stamping pipeline stage.
pub struct TenantIdProcessor {
    header_name: String,
    attribute_key: String,
}

impl TenantIdProcessor {
    fn extract_tenant_id(&self, ctx: &RequestContext) -> Result<String, TenantError> {
        let values = ctx.metadata().get_all(&self.header_name);
        match values {
            [] => Err(TenantError::MissingHeader {
                header_name: self.header_name.clone(),
            }),
            [value] if value.is_empty() => Err(TenantError::MissingHeader {
                header_name: self.header_name.clone(),
            }),
            [value] => Ok(value.clone()),
            _ => Err(TenantError::MultipleHeaders {
                header_name: self.header_name.clone(),
                count: values.len(),
            }),
        }
    }
}

#[async_trait]
impl Processor for TenantIdProcessor {
    async fn process_traces(&self, ctx: &RequestContext, traces: &mut Traces) -> Result<(), GenericError> {
        let tenant_id = self.extract_tenant_id(ctx)?;

        let mut stamped = 0;
        for span in traces.spans_mut() {
            span.attributes_mut().insert(
                self.attribute_key.clone(),
                AttributeValue::String(tenant_id.clone()),
            );
            stamped += 1;
        }

        debug!(tenant_id = %tenant_id, spans = stamped, "Stamped tenant ID onto trace batch.");
        Ok(())
    }

    async fn process_metrics(&self, ctx: &RequestContext, metrics: &mut Metrics) -> Result<(), GenericError> {
        let tenant_id = self.extract_tenant_id(ctx)?;

        let mut stamped = 0;
        for labels in metrics.datapoint_labels_mut() {
            labels.insert(self.attribute_key.clone(), tenant_id.clone());
            stamped += 1;
        }

        debug!(tenant_id = %tenant_id, datapoints = stamped, "Stamped tenant ID onto metric batch.");
        Ok(())
    }
}
