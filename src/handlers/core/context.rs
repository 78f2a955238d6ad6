//! Handler context and the handler trait.

use crate::error::HandlerResult;
use crate::state::{Binding, Board};
use async_trait::async_trait;
use std::sync::Arc;
use stormer_proto::{Frame, ServerEvent};

/// Handler context passed to each event handler.
pub struct Context<'a> {
    /// The sending connection.
    pub conn_id: &'a str,
    /// Shared server state.
    pub board: &'a Arc<Board>,
}

impl<'a> Context<'a> {
    pub fn new(conn_id: &'a str, board: &'a Arc<Board>) -> Self {
        Self { conn_id, board }
    }

    /// Queue an event for the sending connection only.
    pub fn reply(&self, event: ServerEvent) -> bool {
        self.board.hub.unicast(self.conn_id, event)
    }

    /// The session this connection is currently bound to, if any.
    pub fn binding(&self) -> Option<Binding> {
        self.board.membership.binding(self.conn_id)
    }
}

/// Trait implemented by all event handlers.
///
/// Handlers take the frame by value and decode the payload type they expect.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult;
}
