//! Connection - Handles an individual WebSocket client.
//!
//! Each connection runs in its own Tokio task: one `tokio::select!` loop over
//! inbound frames, the connection's outbound queue, and a keepalive timer.
//! Handlers run inline, so events from one client are processed in order.

use crate::config::WebSocketConfig;
use crate::handlers::{Context, Registry};
use crate::network::limit::{FloodGuard, FloodVerdict, RateLimiter};
use crate::state::Board;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stormer_proto::{Frame, ServerEvent, encode};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, debug, info, warn};

/// Consecutive over-limit frames before the connection is dropped.
const MAX_FLOOD_VIOLATIONS: u8 = 3;

const SLOW_DOWN: &str = "Slow down";

/// A client connection handler.
pub struct Connection {
    addr: SocketAddr,
    board: Arc<Board>,
    registry: Arc<Registry>,
    ping_interval: Duration,
    ping_timeout: Duration,
}

impl Connection {
    pub fn new(
        addr: SocketAddr,
        board: Arc<Board>,
        registry: Arc<Registry>,
        websocket: &WebSocketConfig,
    ) -> Self {
        Self {
            addr,
            board,
            registry,
            ping_interval: websocket.ping_interval(),
            ping_timeout: websocket.ping_timeout(),
        }
    }

    /// Serve an upgraded socket until either side closes it.
    pub async fn run(self, socket: WebSocket) {
        let (tx, rx) = mpsc::channel(self.board.limits.outbound_queue);
        let conn_id = self.board.connect(tx);
        let span = crate::telemetry::spans::connection(&conn_id, self.addr);

        async {
            crate::metrics::connection_opened();
            info!(connections = self.board.hub.connection_count(), "Connection opened");

            let reason = self.event_loop(&conn_id, socket, rx).await;

            if let Err(e) = crate::handlers::disconnect(&self.board, &conn_id).await {
                warn!(error = %e, "Disconnect cleanup failed");
            }
            self.board.hub.unregister(&conn_id);
            crate::metrics::connection_closed();
            info!(reason, "Connection closed");
        }
        .instrument(span)
        .await
    }

    async fn event_loop(
        &self,
        conn_id: &str,
        socket: WebSocket,
        mut rx: mpsc::Receiver<Arc<ServerEvent>>,
    ) -> &'static str {
        let (mut sink, mut stream) = socket.split();
        let limits = &self.board.limits;
        let mut flood = FloodGuard::new(
            RateLimiter::new(limits.message_rate, limits.message_burst),
            MAX_FLOOD_VIOLATIONS,
        );
        let mut ping = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen = Instant::now();

        let reason = loop {
            tokio::select! {
                inbound = stream.next() => {
                    let message = match inbound {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => {
                            debug!(error = %e, "WebSocket read failed");
                            break "read error";
                        }
                        None => break "closed by peer",
                    };
                    last_seen = Instant::now();

                    match message {
                        Message::Text(text) => match flood.check() {
                            FloodVerdict::Allow => self.handle_text(conn_id, &text).await,
                            FloodVerdict::Reject { violations } => {
                                crate::metrics::record_rate_limited();
                                warn!(violations, "Rate limit exceeded");
                                self.board.hub.unicast(conn_id, ServerEvent::error(SLOW_DOWN));
                            }
                            FloodVerdict::Disconnect => {
                                crate::metrics::record_rate_limited();
                                warn!("Excess flood, disconnecting");
                                if let Ok(text) = encode(&ServerEvent::error(SLOW_DOWN)) {
                                    let _ = sink.send(Message::Text(text)).await;
                                }
                                break "excess flood";
                            }
                        },
                        Message::Binary(_) => debug!("Ignoring binary frame"),
                        // Pings are answered by the WebSocket layer; both only refresh liveness.
                        Message::Ping(_) | Message::Pong(_) => {}
                        Message::Close(_) => break "closed by peer",
                    }
                }

                Some(event) = rx.recv() => {
                    match encode(event.as_ref()) {
                        Ok(text) => {
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                debug!(error = %e, "WebSocket write failed");
                                break "write error";
                            }
                        }
                        Err(e) => warn!(event = event.name(), error = %e, "Failed to encode event"),
                    }
                }

                _ = ping.tick() => {
                    if last_seen.elapsed() >= self.ping_timeout {
                        info!(idle_secs = last_seen.elapsed().as_secs(), "Ping timeout");
                        break "ping timeout";
                    }
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        break "write error";
                    }
                }
            }
        };

        let _ = sink.send(Message::Close(None)).await;
        reason
    }

    async fn handle_text(&self, conn_id: &str, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed frame");
                return;
            }
        };
        let ctx = Context::new(conn_id, &self.board);
        // Failures were already reported to the client by the registry.
        let _ = self.registry.dispatch(&ctx, frame).await;
    }
}
