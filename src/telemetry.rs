//! Telemetry utilities for event timing and span construction.

use std::time::Instant;

/// Guard for timing event handling and recording metrics.
///
/// Records handler latency when dropped.
pub struct EventTimer {
    event: &'static str,
    start: Instant,
}

impl EventTimer {
    /// Start timing an event.
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            start: Instant::now(),
        }
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_event(self.event, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;
    use tracing::{Span, debug_span, info_span};

    /// Create a span for a WebSocket connection.
    pub fn connection(conn: &str, addr: SocketAddr) -> Span {
        info_span!("connection", conn = %conn, addr = %addr)
    }

    /// Create a span for one dispatched event.
    pub fn event(name: &str, conn: &str) -> Span {
        debug_span!("event", event = %name, conn = %conn)
    }
}
