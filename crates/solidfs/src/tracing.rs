//! I define the telemetry setup of a mount, and the propagation of
//! trace context over outbound requests.
//!

use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Install the process-wide telemetry pipeline.
///
/// `log` records from dependencies are bridged into `tracing`, and
/// events go to stderr so they interleave with the kernel driver,
/// which keeps the mount in the foreground. Thread names are included
/// because operations run on kernel worker threads while long-lived
/// tasks run on `solidfs-background`, and telling them apart matters
/// when reading a trace. `RUST_LOG` overrides `default_directives`.
///
/// It should only be called once, before the mount starts!
pub fn init_telemetry(default_directives: &str) {
    LogTracer::init().expect("Failed to set logger");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let formatting_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_target(false);

    set_global_default(Registry::default().with(filter).with(formatting_layer))
        .expect("Failed to set subscriber");
}

/// `X-Request-ID` header name.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// `Request-ID` header name.
pub static REQUEST_ID: HeaderName = HeaderName::from_static("request-id");

/// `X-Correlation-ID` header name.
pub static X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// `Correlation-ID` header name.
pub static CORRELATION_ID: HeaderName = HeaderName::from_static("correlation-id");

/// Get trace propagation headers for an outbound request.
///
/// The request id pair carries the current span id when a subscriber
/// is active; the correlation pair carries the session identifier.
/// The `X-` prefixed names are deprecated per
/// [rfc6648](https://datatracker.ietf.org/doc/html/rfc6648), but are
/// still the ones most middleboxes understand, so both are sent.
pub fn trace_headers(session_identifier: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(span_id) = tracing::Span::current().id() {
        let formatted = format!("{:016x}", span_id.into_u64());
        let value = HeaderValue::from_str(&formatted).expect("hex is a valid header value");
        headers.insert(X_REQUEST_ID.clone(), value.clone());
        headers.insert(REQUEST_ID.clone(), value);
    }

    if let Ok(value) = HeaderValue::from_str(session_identifier) {
        headers.insert(X_CORRELATION_ID.clone(), value.clone());
        headers.insert(CORRELATION_ID.clone(), value);
    }

    headers
}
