//! Prometheus metrics collection for stormerd.
//!
//! Metrics live behind `OnceLock`s and are registered once by [`init`].
//! Every recorder is a no-op until then, so unit tests never need a registry.
//!
//! - `stormer_events_total{event}` - Client events processed by type
//! - `stormer_event_duration_seconds{event}` - Handler latency histogram
//! - `stormer_broadcast_fanout` - Recipients per room broadcast (histogram)

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Sessions created.
pub static SESSIONS_CREATED: OnceLock<IntCounter> = OnceLock::new();

/// Sessions removed by the expiry sweep.
pub static SESSIONS_EXPIRED: OnceLock<IntCounter> = OnceLock::new();

/// Events dropped because a recipient's outbound queue was full.
pub static MESSAGES_DROPPED: OnceLock<IntCounter> = OnceLock::new();

/// Inbound frames rejected by flood protection.
pub static RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Open WebSocket connections.
pub static CONNECTIONS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Per-event metrics
// ========================================================================

pub static EVENT_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

pub static EVENT_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Handler errors by event and error code.
pub static EVENT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Broadcast fan-out: how many connections received a room event.
pub static BROADCAST_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(SESSIONS_CREATED, IntCounter::new("stormer_sessions_created_total", "Sessions created"));
    register!(SESSIONS_EXPIRED, IntCounter::new("stormer_sessions_expired_total", "Sessions removed by expiry"));
    register!(MESSAGES_DROPPED, IntCounter::new("stormer_messages_dropped_total", "Events dropped on full outbound queues"));
    register!(RATE_LIMITED, IntCounter::new("stormer_rate_limited_total", "Inbound frames rejected by flood protection"));
    register!(CONNECTIONS, IntGauge::new("stormer_connections", "Open WebSocket connections"));

    register!(EVENT_COUNTER, IntCounterVec::new(Opts::new("stormer_events_total", "Client events processed by type"), &["event"]));
    register!(EVENT_LATENCY, HistogramVec::new(
        HistogramOpts::new("stormer_event_duration_seconds", "Event handler latency by type")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["event"]));
    register!(EVENT_ERRORS, IntCounterVec::new(Opts::new("stormer_event_errors_total", "Event errors by type and code"), &["event", "code"]));
    register!(BROADCAST_FANOUT, Histogram::with_opts(
        HistogramOpts::new("stormer_broadcast_fanout", "Recipients per room broadcast")
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recorders
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

/// Record an event execution with latency.
#[inline]
pub fn record_event(event: &str, duration_secs: f64) {
    if let Some(c) = EVENT_COUNTER.get() {
        c.with_label_values(&[event]).inc();
    }
    if let Some(h) = EVENT_LATENCY.get() {
        h.with_label_values(&[event]).observe(duration_secs);
    }
}

/// Record a handler error.
#[inline]
pub fn record_event_error(event: &str, code: &str) {
    if let Some(c) = EVENT_ERRORS.get() {
        c.with_label_values(&[event, code]).inc();
    }
}

/// Record how many connections a room broadcast reached.
#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(h) = BROADCAST_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

#[inline]
pub fn record_dropped() {
    inc(&MESSAGES_DROPPED);
}

#[inline]
pub fn record_rate_limited() {
    inc(&RATE_LIMITED);
}

#[inline]
pub fn record_session_created() {
    inc(&SESSIONS_CREATED);
}

#[inline]
pub fn record_expired() {
    inc(&SESSIONS_EXPIRED);
}

#[inline]
pub fn connection_opened() {
    if let Some(g) = CONNECTIONS.get() {
        g.inc();
    }
}

#[inline]
pub fn connection_closed() {
    if let Some(g) = CONNECTIONS.get() {
        g.dec();
    }
}
