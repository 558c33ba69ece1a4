//! Metrics.

use traceguard_common::collections::FastHashMap;

use super::trace::{InstrumentationScope, Resource};

/// A datapoint label map.
pub type LabelMap = FastHashMap<String, String>;

/// A batch of metrics, as handed to processors by the host pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metrics {
    resource_metrics: Vec<ResourceMetrics>,
}

impl Metrics {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the resource-level groupings.
    pub fn resource_metrics(&self) -> &[ResourceMetrics] {
        &self.resource_metrics
    }

    /// Returns a mutable reference to the resource-level groupings.
    pub fn resource_metrics_mut(&mut self) -> &mut Vec<ResourceMetrics> {
        &mut self.resource_metrics
    }

    /// Adds a resource-level grouping to the batch.
    pub fn push_resource_metrics(&mut self, resource_metrics: ResourceMetrics) {
        self.resource_metrics.push(resource_metrics);
    }

    /// Iterates over every metric in the batch.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.resource_metrics
            .iter()
            .flat_map(|rm| rm.scope_metrics.iter())
            .flat_map(|sm| sm.metrics.iter())
    }

    /// Iterates mutably over every metric in the batch.
    pub fn metrics_mut(&mut self) -> impl Iterator<Item = &mut Metric> {
        self.resource_metrics
            .iter_mut()
            .flat_map(|rm| rm.scope_metrics.iter_mut())
            .flat_map(|sm| sm.metrics.iter_mut())
    }

    /// Iterates mutably over the label map of every datapoint in the batch.
    pub fn datapoint_labels_mut(&mut self) -> impl Iterator<Item = &mut LabelMap> {
        self.metrics_mut().flat_map(|m| m.data.labels_mut())
    }

    /// Returns the total number of datapoints in the batch.
    pub fn datapoint_count(&self) -> usize {
        self.metrics().map(|m| m.data.datapoint_count()).sum()
    }

    /// Returns `true` if the batch holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.metrics().next().is_none()
    }
}

/// Metrics grouped under a single resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceMetrics {
    resource: Resource,
    scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    /// Creates a grouping under the given resource.
    pub fn from_resource(resource: Resource) -> Self {
        Self {
            resource,
            scope_metrics: Vec::new(),
        }
    }

    /// Returns a reference to the resource.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Returns a mutable reference to the scope-level groupings.
    pub fn scope_metrics_mut(&mut self) -> &mut Vec<ScopeMetrics> {
        &mut self.scope_metrics
    }

    /// Adds a scope-level grouping.
    pub fn push_scope_metrics(&mut self, scope_metrics: ScopeMetrics) {
        self.scope_metrics.push(scope_metrics);
    }
}

/// Metrics grouped under a single instrumentation scope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeMetrics {
    scope: InstrumentationScope,
    metrics: Vec<Metric>,
}

impl ScopeMetrics {
    /// Creates a grouping under the given scope.
    pub fn from_scope(scope: InstrumentationScope) -> Self {
        Self {
            scope,
            metrics: Vec::new(),
        }
    }

    /// Returns a reference to the scope.
    pub fn scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Returns a mutable reference to the metrics.
    pub fn metrics_mut(&mut self) -> &mut Vec<Metric> {
        &mut self.metrics
    }

    /// Adds a metric.
    pub fn push_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }
}

/// A single metric: a named measurement with one or more datapoints.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    name: String,
    description: String,
    unit: String,
    data: MetricData,
}

impl Metric {
    /// Creates a gauge metric from the given datapoints.
    pub fn gauge(name: impl Into<String>, points: Vec<NumberDataPoint>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            data: MetricData::Gauge { points },
        }
    }

    /// Creates a sum metric from the given datapoints.
    pub fn sum(name: impl Into<String>, points: Vec<NumberDataPoint>, monotonic: bool) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            data: MetricData::Sum { points, monotonic },
        }
    }

    /// Creates a histogram metric from the given datapoints.
    pub fn histogram(name: impl Into<String>, points: Vec<HistogramDataPoint>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            data: MetricData::Histogram { points },
        }
    }

    /// Returns the metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metric description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the unit the metric is measured in.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Returns a reference to the metric data.
    pub fn data(&self) -> &MetricData {
        &self.data
    }

    /// Returns a mutable reference to the metric data.
    pub fn data_mut(&mut self) -> &mut MetricData {
        &mut self.data
    }
}

/// The datapoints of a metric, by metric type.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricData {
    /// The latest value of a quantity.
    Gauge {
        /// Recorded datapoints.
        points: Vec<NumberDataPoint>,
    },

    /// A quantity aggregated over time.
    Sum {
        /// Recorded datapoints.
        points: Vec<NumberDataPoint>,

        /// Whether the sum only ever increases.
        monotonic: bool,
    },

    /// The distribution of a quantity.
    Histogram {
        /// Recorded datapoints.
        points: Vec<HistogramDataPoint>,
    },
}

impl MetricData {
    /// Iterates mutably over the label map of every datapoint.
    pub fn labels_mut(&mut self) -> Box<dyn Iterator<Item = &mut LabelMap> + '_> {
        match self {
            Self::Gauge { points } | Self::Sum { points, .. } => {
                Box::new(points.iter_mut().map(|p| &mut p.labels))
            }
            Self::Histogram { points } => Box::new(points.iter_mut().map(|p| &mut p.labels)),
        }
    }

    /// Returns the number of datapoints.
    pub fn datapoint_count(&self) -> usize {
        match self {
            Self::Gauge { points } | Self::Sum { points, .. } => points.len(),
            Self::Histogram { points } => points.len(),
        }
    }
}

/// A scalar datapoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumberDataPoint {
    labels: LabelMap,
    timestamp_unix_nanos: u64,
    value: NumberValue,
}

impl NumberDataPoint {
    /// Creates a datapoint with the given value.
    pub fn new(value: NumberValue) -> Self {
        Self {
            labels: LabelMap::default(),
            timestamp_unix_nanos: 0,
            value,
        }
    }

    /// Returns a reference to the datapoint labels.
    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Returns a mutable reference to the datapoint labels.
    pub fn labels_mut(&mut self) -> &mut LabelMap {
        &mut self.labels
    }

    /// Returns the datapoint timestamp, in nanoseconds since the Unix epoch.
    pub fn timestamp_unix_nanos(&self) -> u64 {
        self.timestamp_unix_nanos
    }

    /// Returns the datapoint value.
    pub fn value(&self) -> NumberValue {
        self.value
    }
}

/// A scalar metric value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberValue {
    /// A signed integer measurement.
    Int(i64),

    /// A floating-point measurement.
    Double(f64),
}

impl Default for NumberValue {
    fn default() -> Self {
        Self::Int(0)
    }
}

/// A histogram datapoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistogramDataPoint {
    labels: LabelMap,
    timestamp_unix_nanos: u64,
    count: u64,
    sum: f64,
    bucket_counts: Vec<u64>,
    explicit_bounds: Vec<f64>,
}

impl HistogramDataPoint {
    /// Creates a datapoint from bucket counts and their explicit bounds.
    pub fn from_buckets(bucket_counts: Vec<u64>, explicit_bounds: Vec<f64>) -> Self {
        let count = bucket_counts.iter().sum();
        Self {
            labels: LabelMap::default(),
            timestamp_unix_nanos: 0,
            count,
            sum: 0.0,
            bucket_counts,
            explicit_bounds,
        }
    }

    /// Returns a reference to the datapoint labels.
    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Returns a mutable reference to the datapoint labels.
    pub fn labels_mut(&mut self) -> &mut LabelMap {
        &mut self.labels
    }

    /// Returns the datapoint timestamp, in nanoseconds since the Unix epoch.
    pub fn timestamp_unix_nanos(&self) -> u64 {
        self.timestamp_unix_nanos
    }

    /// Returns the total sample count.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the sum of all samples.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Returns the per-bucket sample counts.
    pub fn bucket_counts(&self) -> &[u64] {
        &self.bucket_counts
    }

    /// Returns the upper bounds of the buckets.
    pub fn explicit_bounds(&self) -> &[f64] {
        &self.explicit_bounds
    }
}
