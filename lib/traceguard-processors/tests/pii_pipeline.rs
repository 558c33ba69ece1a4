//! End-to-end pipeline tests: tenant-ID stamping followed by PII redaction, the order the
//! processors sit in between receivers and exporters.

use traceguard_config::GenericConfiguration;
use traceguard_core::data_model::attribute::AttributeValue;
use traceguard_core::data_model::trace::{ResourceSpans, ScopeSpans, Span, Traces};
use traceguard_core::processor::{MetadataMap, Processor as _, RequestContext};
use traceguard_processors::pii::{PiiFilterConfiguration, PiiFilterProcessor};
use traceguard_processors::tenant::{TenantIdConfiguration, TenantIdProcessor};

const PIPELINE_CONFIG: &str = "
prefixes:
  - http.request.header.
key_regexs:
  - regex: ^password$
  - regex: ^authorization$
    redactor: truncate
  - regex: ^jsessionid$
    redactor: hash
    session_identifier: true
value_regexs:
  - regex: '[0-9]{3}-[0-9]{2}-[0-9]{4}'
";

fn pii_processor() -> PiiFilterProcessor {
    let generic = GenericConfiguration::from_yaml(PIPELINE_CONFIG).unwrap();
    PiiFilterConfiguration::from_configuration(&generic)
        .unwrap()
        .build()
        .unwrap()
}

fn tenant_processor() -> TenantIdProcessor {
    TenantIdConfiguration::default().build().unwrap()
}

fn tenant_context(tenant_id: &str) -> RequestContext {
    let mut metadata = MetadataMap::new();
    metadata.append("x-tenant-id", tenant_id);
    RequestContext::from_metadata(metadata)
}

fn login_span() -> Span {
    let mut span = Span::new("POST /login");
    let attributes = span.attributes_mut();
    attributes.insert(
        "http.url".to_string(),
        AttributeValue::from("http://traceshop.dev/login?username=george&password=washington"),
    );
    attributes.insert(
        "http.request.header.cookie".to_string(),
        AttributeValue::from("theme=dark; jsessionid=jdoe"),
    );
    attributes.insert(
        "http.request.header.authorization".to_string(),
        AttributeValue::from("Bearer t0ps3cret"),
    );
    attributes.insert(
        "db.statement".to_string(),
        AttributeValue::from("SELECT * FROM users WHERE password = 'washington'"),
    );
    attributes.insert(
        "note".to_string(),
        AttributeValue::from("customer ssn 123-45-6789 verified"),
    );
    span
}

fn batch_of(spans: Vec<Span>) -> Traces {
    let mut scope_spans = ScopeSpans::default();
    for span in spans {
        scope_spans.push_span(span);
    }
    let mut resource_spans = ResourceSpans::default();
    resource_spans.push_scope_spans(scope_spans);
    let mut traces = Traces::new();
    traces.push_resource_spans(resource_spans);
    traces
}

fn span_attr<'a>(traces: &'a Traces, key: &str) -> Option<&'a str> {
    traces.spans().next().unwrap().attributes().get(key).and_then(|v| v.as_str())
}

#[tokio::test]
async fn pipeline_stamps_then_redacts() {
    let tenant = tenant_processor();
    let pii = pii_processor();
    let ctx = tenant_context("jdoe");

    let mut traces = batch_of(vec![login_span(), Span::new("GET /health")]);
    tenant.process_traces(&ctx, &mut traces).await.unwrap();
    pii.process_traces(&ctx, &mut traces).await.unwrap();

    // Every span carries the tenant, including ones the PII stage had nothing to do on.
    for span in traces.spans() {
        assert_eq!(span.attributes().get("tenant-id"), Some(&AttributeValue::from("jdoe")));
    }

    // URL query rewritten, flattened entries merged back with redacted stand-ins.
    assert_eq!(
        span_attr(&traces, "http.url").unwrap(),
        "http://traceshop.dev/login?password=***&username=george"
    );
    assert_eq!(span_attr(&traces, "http.url.username").unwrap(), "george");
    assert_eq!(span_attr(&traces, "http.url.password").unwrap(), "***");
    assert_eq!(span_attr(&traces, "http.url.redacted_keys").unwrap(), "http.url.password");

    // Cookie header: session cookie hashed, session.id surfaced at the span top level.
    let session_hash = "d30a5f57532a603697ccbb51558fa02ccadd74a0c499fcf9d45b33863ee1582f";
    assert_eq!(
        span_attr(&traces, "http.request.header.cookie").unwrap(),
        format!("jsessionid={}; theme=dark", session_hash)
    );
    assert_eq!(span_attr(&traces, "session.id").unwrap(), session_hash);

    // Prefix-truncated key matched the authorization rule; truncation keeps first/last chars.
    assert_eq!(
        span_attr(&traces, "http.request.header.authorization").unwrap(),
        "B***t"
    );

    // SQL literal redacted in place.
    assert_eq!(
        span_attr(&traces, "db.statement").unwrap(),
        "SELECT * FROM users WHERE password = '***'"
    );

    // Value rule caught the SSN inside a plain attribute.
    assert_eq!(span_attr(&traces, "note").unwrap(), "customer ssn *** verified");
}

#[tokio::test]
async fn redacted_originals_never_leak() {
    let pii = pii_processor();
    let ctx = RequestContext::new();

    let mut traces = batch_of(vec![login_span()]);
    pii.process_traces(&ctx, &mut traces).await.unwrap();

    let span = traces.spans().next().unwrap();
    for (key, value) in span.attributes() {
        if let Some(text) = value.as_str() {
            assert!(!text.contains("washington"), "leaked original in {}: {}", key, text);
            assert!(!text.contains("123-45-6789"), "leaked SSN in {}: {}", key, text);
            assert!(!text.contains("t0ps3cret"), "leaked token in {}: {}", key, text);
            assert!(!text.contains("jdoe") || key == "tenant-id", "leaked session in {}: {}", key, text);
        }
    }
}

// The `redact` and `truncate` strategies reach a fixed point after one pass; `hash` does not
// (re-hashing a digest yields a new digest), so the idempotence config carries no hash rules.
const IDEMPOTENT_CONFIG: &str = "
prefixes:
  - http.request.header.
key_regexs:
  - regex: ^password$
  - regex: ^authorization$
    redactor: truncate
value_regexs:
  - regex: '[0-9]{3}-[0-9]{2}-[0-9]{4}'
";

#[tokio::test]
async fn pipeline_is_idempotent() {
    let generic = GenericConfiguration::from_yaml(IDEMPOTENT_CONFIG).unwrap();
    let pii = PiiFilterConfiguration::from_configuration(&generic)
        .unwrap()
        .build()
        .unwrap();
    let ctx = RequestContext::new();

    let mut traces = batch_of(vec![login_span()]);
    pii.process_traces(&ctx, &mut traces).await.unwrap();
    let once = traces.clone();

    pii.process_traces(&ctx, &mut traces).await.unwrap();
    assert_eq!(once, traces);
}

#[tokio::test]
async fn tenant_failure_precedes_redaction() {
    let tenant = tenant_processor();
    let ctx = RequestContext::new();

    let mut traces = batch_of(vec![login_span()]);
    let result = tenant.process_traces(&ctx, &mut traces).await;
    assert!(result.is_err());

    // The batch is rejected before any stamping happened.
    assert!(traces.spans().next().unwrap().attributes().get("tenant-id").is_none());
}
