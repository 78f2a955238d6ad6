//! The Board - shared state for the brainstorming server.
//!
//! Handlers, the gateway, the HTTP API, and the expiry sweeper all reach the
//! store and the connection tables through one `Arc<Board>`.

use super::code::CodeGenerator;
use super::conn::{ConnId, ConnIdGenerator};
use super::hub::{Hub, Outbound};
use super::membership::Membership;
use crate::config::{Config, LimitsConfig};
use crate::store::SessionStore;
use std::sync::Arc;
use stormer_proto::{ServerEvent, SessionEnded};
use tracing::info;

/// Identity reported by the HTTP API.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub environment: String,
}

pub struct Board {
    /// Session persistence, already wrapped in the per-call timeout.
    pub store: Arc<dyn SessionStore>,

    /// Outbound queues and room subscriber sets.
    pub hub: Arc<Hub>,

    /// Connection to `(code, username)` bindings.
    pub membership: Membership,

    pub codes: CodeGenerator,

    pub conn_ids: ConnIdGenerator,

    pub server_info: ServerInfo,

    pub limits: LimitsConfig,
}

impl Board {
    pub fn new(store: Arc<dyn SessionStore>, config: &Config) -> Self {
        let hub = Arc::new(Hub::new());
        Self {
            membership: Membership::new(Arc::clone(&store), Arc::clone(&hub)),
            store,
            hub,
            codes: CodeGenerator::new(config.limits.max_code_attempts),
            conn_ids: ConnIdGenerator::new(),
            server_info: ServerInfo {
                name: config.server.name.clone(),
                environment: config.server.environment.clone(),
            },
            limits: config.limits.clone(),
        }
    }

    /// In-memory board with default settings.
    #[cfg(test)]
    pub fn for_tests() -> Arc<Self> {
        use crate::store::MemoryStore;
        use std::time::Duration;

        let config: Config =
            toml::from_str("[listen]\naddress = \"127.0.0.1:0\"\n").expect("test config");
        let store = Arc::new(MemoryStore::new(Duration::from_secs(86400)));
        Arc::new(Self::new(store, &config))
    }

    /// Register a new connection's outbound queue and hand out its id.
    pub fn connect(&self, tx: Outbound) -> ConnId {
        let conn = self.conn_ids.next();
        self.hub.register(&conn, tx);
        conn
    }

    /// Tell everyone in a deleted session why, then drop the room.
    ///
    /// The session must already be gone from the store.
    pub fn end_session(&self, code: &str, message: &str) -> usize {
        let notified = self.hub.broadcast(
            code,
            ServerEvent::SessionEnded(SessionEnded {
                message: message.to_string(),
            }),
            None,
        );
        let unbound = self.membership.dissolve(code);
        info!(code = %code, notified, unbound, reason = message, "Session ended");
        notified
    }
}
