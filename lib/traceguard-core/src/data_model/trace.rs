//! Traces.

use super::attribute::AttributeMap;

/// A batch of traces, as handed to processors by the host pipeline.
///
/// The tree shape (resource → scope → span) is fixed: processors mutate attribute maps in place
/// and never reshape the tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Traces {
    resource_spans: Vec<ResourceSpans>,
}

impl Traces {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the resource-level groupings.
    pub fn resource_spans(&self) -> &[ResourceSpans] {
        &self.resource_spans
    }

    /// Returns a mutable reference to the resource-level groupings.
    pub fn resource_spans_mut(&mut self) -> &mut Vec<ResourceSpans> {
        &mut self.resource_spans
    }

    /// Adds a resource-level grouping to the batch.
    pub fn push_resource_spans(&mut self, resource_spans: ResourceSpans) {
        self.resource_spans.push(resource_spans);
    }

    /// Iterates over every span in the batch.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.resource_spans
            .iter()
            .flat_map(|rs| rs.scope_spans.iter())
            .flat_map(|ss| ss.spans.iter())
    }

    /// Iterates mutably over every span in the batch.
    pub fn spans_mut(&mut self) -> impl Iterator<Item = &mut Span> {
        self.resource_spans
            .iter_mut()
            .flat_map(|rs| rs.scope_spans.iter_mut())
            .flat_map(|ss| ss.spans.iter_mut())
    }

    /// Returns the total number of spans in the batch.
    pub fn span_count(&self) -> usize {
        self.spans().count()
    }

    /// Returns `true` if the batch holds no spans.
    pub fn is_empty(&self) -> bool {
        self.span_count() == 0
    }
}

/// A set of attributes describing the origin of telemetry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    attributes: AttributeMap,
}

impl Resource {
    /// Creates an empty resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the resource attributes.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Returns a mutable reference to the resource attributes.
    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }
}

/// Spans grouped under a single resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSpans {
    resource: Resource,
    scope_spans: Vec<ScopeSpans>,
}

impl ResourceSpans {
    /// Creates a grouping under the given resource.
    pub fn from_resource(resource: Resource) -> Self {
        Self {
            resource,
            scope_spans: Vec::new(),
        }
    }

    /// Returns a reference to the resource.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Returns a reference to the scope-level groupings.
    pub fn scope_spans(&self) -> &[ScopeSpans] {
        &self.scope_spans
    }

    /// Returns a mutable reference to the scope-level groupings.
    pub fn scope_spans_mut(&mut self) -> &mut Vec<ScopeSpans> {
        &mut self.scope_spans
    }

    /// Adds a scope-level grouping.
    pub fn push_scope_spans(&mut self, scope_spans: ScopeSpans) {
        self.scope_spans.push(scope_spans);
    }
}

/// The instrumentation scope that produced a group of telemetry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstrumentationScope {
    name: String,
    version: String,
}

impl InstrumentationScope {
    /// Creates a scope with the given name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Returns the scope name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Spans grouped under a single instrumentation scope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeSpans {
    scope: InstrumentationScope,
    spans: Vec<Span>,
}

impl ScopeSpans {
    /// Creates a grouping under the given scope.
    pub fn from_scope(scope: InstrumentationScope) -> Self {
        Self {
            scope,
            spans: Vec::new(),
        }
    }

    /// Returns a reference to the scope.
    pub fn scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Returns a reference to the spans.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Returns a mutable reference to the spans.
    pub fn spans_mut(&mut self) -> &mut Vec<Span> {
        &mut self.spans
    }

    /// Adds a span.
    pub fn push_span(&mut self, span: Span) {
        self.spans.push(span);
    }
}

/// A single timed operation in a distributed trace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Span {
    trace_id: [u8; 16],
    span_id: [u8; 8],
    parent_span_id: [u8; 8],
    name: String,
    start_time_unix_nanos: u64,
    end_time_unix_nanos: u64,
    attributes: AttributeMap,
    events: Vec<SpanEvent>,
    status: SpanStatus,
}

impl Span {
    /// Creates a span with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns the span name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the trace ID.
    pub fn trace_id(&self) -> [u8; 16] {
        self.trace_id
    }

    /// Sets the trace ID.
    pub fn set_trace_id(&mut self, trace_id: [u8; 16]) {
        self.trace_id = trace_id;
    }

    /// Returns the span ID.
    pub fn span_id(&self) -> [u8; 8] {
        self.span_id
    }

    /// Sets the span ID.
    pub fn set_span_id(&mut self, span_id: [u8; 8]) {
        self.span_id = span_id;
    }

    /// Returns the parent span ID.
    pub fn parent_span_id(&self) -> [u8; 8] {
        self.parent_span_id
    }

    /// Sets the parent span ID.
    pub fn set_parent_span_id(&mut self, parent_span_id: [u8; 8]) {
        self.parent_span_id = parent_span_id;
    }

    /// Returns the start timestamp, in nanoseconds since the Unix epoch.
    pub fn start_time_unix_nanos(&self) -> u64 {
        self.start_time_unix_nanos
    }

    /// Sets the start timestamp, in nanoseconds since the Unix epoch.
    pub fn set_start_time_unix_nanos(&mut self, nanos: u64) {
        self.start_time_unix_nanos = nanos;
    }

    /// Returns the end timestamp, in nanoseconds since the Unix epoch.
    pub fn end_time_unix_nanos(&self) -> u64 {
        self.end_time_unix_nanos
    }

    /// Sets the end timestamp, in nanoseconds since the Unix epoch.
    pub fn set_end_time_unix_nanos(&mut self, nanos: u64) {
        self.end_time_unix_nanos = nanos;
    }

    /// Returns a reference to the span attributes.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Returns a mutable reference to the span attributes.
    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }

    /// Returns a reference to the span events.
    pub fn events(&self) -> &[SpanEvent] {
        &self.events
    }

    /// Returns a mutable reference to the span events.
    pub fn events_mut(&mut self) -> &mut Vec<SpanEvent> {
        &mut self.events
    }

    /// Adds an event.
    pub fn push_event(&mut self, event: SpanEvent) {
        self.events.push(event);
    }

    /// Returns the span status.
    pub fn status(&self) -> &SpanStatus {
        &self.status
    }

    /// Sets the span status.
    pub fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }
}

/// A timestamped annotation on a span.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanEvent {
    name: String,
    timestamp_unix_nanos: u64,
    attributes: AttributeMap,
}

impl SpanEvent {
    /// Creates an event with the given name and timestamp.
    pub fn new(name: impl Into<String>, timestamp_unix_nanos: u64) -> Self {
        Self {
            name: name.into(),
            timestamp_unix_nanos,
            attributes: AttributeMap::default(),
        }
    }

    /// Returns the event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the event timestamp, in nanoseconds since the Unix epoch.
    pub fn timestamp_unix_nanos(&self) -> u64 {
        self.timestamp_unix_nanos
    }

    /// Returns a reference to the event attributes.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Returns a mutable reference to the event attributes.
    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }
}

/// The outcome of the operation a span describes.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SpanStatus {
    /// No status was recorded.
    #[default]
    Unset,

    /// The operation completed successfully.
    Ok,

    /// The operation failed.
    Error {
        /// Failure description.
        message: String,
    },
}
