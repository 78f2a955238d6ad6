//! Gateway - HTTP listener that upgrades WebSocket clients.
//!
//! The Gateway binds the configured address and serves the HTTP API, static
//! files, and the WebSocket endpoint from one axum router.

use crate::config::Config;
use crate::handlers::Registry;
use crate::http::{self, AppState};
use crate::network::Connection;
use crate::state::Board;
use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// The Gateway accepts HTTP connections and spawns a Connection per upgrade.
pub struct Gateway {
    listener: TcpListener,
    router: Router,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(
        config: &Config,
        board: Arc<Board>,
        registry: Arc<Registry>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen.address).await?;
        info!(
            server = %board.server_info.name,
            address = %listener.local_addr()?,
            ws_path = %config.websocket.path,
            "Listener bound"
        );

        let state = AppState::new(config, board, registry);
        Ok(Self {
            listener,
            router: http::router(config, state),
        })
    }

    /// Serve until Ctrl-C.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        axum::serve(
            self.listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        info!("Gateway stopped");
        Ok(())
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if let Err(rejection) = state.origins.check(origin) {
        warn!(%addr, %rejection, "WebSocket upgrade rejected");
        return (StatusCode::FORBIDDEN, rejection.to_string()).into_response();
    }

    let connection = Connection::new(
        addr,
        Arc::clone(&state.board),
        Arc::clone(&state.registry),
        &state.websocket,
    );
    ws.max_message_size(state.max_frame_bytes)
        .max_frame_size(state.max_frame_bytes)
        .on_upgrade(move |socket| connection.run(socket))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
