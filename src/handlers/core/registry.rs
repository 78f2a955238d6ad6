//! Event handler registry and dispatch.

use super::context::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{
    ideas::{NewIdeaHandler, ToggleTodoHandler},
    membership::{JoinSessionHandler, LeaveSessionHandler},
    session::{CreateSessionHandler, EndSessionHandler, RequestSessionDataHandler},
};
use crate::telemetry::EventTimer;
use std::collections::HashMap;
use stormer_proto::event::{
    CREATE_SESSION, END_SESSION, JOIN_SESSION, LEAVE_SESSION, NEW_IDEA, REQUEST_SESSION_DATA,
    TOGGLE_TODO,
};
use stormer_proto::{Frame, ServerEvent};
use tracing::{Instrument, debug, warn};

/// Registry of event handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Session lifecycle
        handlers.insert(CREATE_SESSION, Box::new(CreateSessionHandler));
        handlers.insert(REQUEST_SESSION_DATA, Box::new(RequestSessionDataHandler));
        handlers.insert(END_SESSION, Box::new(EndSessionHandler));

        // Membership
        handlers.insert(JOIN_SESSION, Box::new(JoinSessionHandler));
        handlers.insert(LEAVE_SESSION, Box::new(LeaveSessionHandler));

        // Board content
        handlers.insert(NEW_IDEA, Box::new(NewIdeaHandler));
        handlers.insert(TOGGLE_TODO, Box::new(ToggleTodoHandler));

        Self { handlers }
    }

    pub fn events(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Dispatch a frame to the handler registered for its event name.
    ///
    /// Errors are reported to the sender (unless silent) and recorded here,
    /// then returned so callers and tests can inspect them. Unknown events
    /// are dropped.
    pub async fn dispatch(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let Some((&event, handler)) = self.handlers.get_key_value(frame.event.as_str()) else {
            debug!(conn = %ctx.conn_id, event = %frame.event, "Ignoring unknown event");
            return Ok(());
        };

        let span = crate::telemetry::spans::event(event, ctx.conn_id);
        let _timer = EventTimer::new(event);

        let result = handler.handle(ctx, frame).instrument(span).await;

        if let Err(ref e) = result {
            report(ctx, event, e);
        }
        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn report(ctx: &Context<'_>, event: &'static str, err: &HandlerError) {
    crate::metrics::record_event_error(event, err.error_code());

    if err.is_internal() {
        warn!(conn = %ctx.conn_id, event, error = %err, "Event failed");
    } else {
        debug!(conn = %ctx.conn_id, event, error = %err, "Event rejected");
    }

    if let Some(message) = err.client_message(event) {
        ctx.reply(ServerEvent::error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Board;
    use tokio::sync::mpsc;

    #[test]
    fn every_client_event_is_registered() {
        let registry = Registry::new();
        let mut events: Vec<_> = registry.events().collect();
        events.sort_unstable();
        assert_eq!(
            events,
            vec![
                CREATE_SESSION,
                END_SESSION,
                JOIN_SESSION,
                LEAVE_SESSION,
                NEW_IDEA,
                REQUEST_SESSION_DATA,
                TOGGLE_TODO,
            ]
        );
    }

    #[tokio::test]
    async fn unknown_event_is_ignored() {
        let board = Board::for_tests();
        let (tx, mut rx) = mpsc::channel(4);
        let conn = board.connect(tx);
        let ctx = Context::new(&conn, &board);

        let frame = Frame::decode(r#"{"event":"draw-shape","data":{}}"#).unwrap();
        assert!(Registry::new().dispatch(&ctx, frame).await.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn bad_payload_gets_invalid_request() {
        let board = Board::for_tests();
        let (tx, mut rx) = mpsc::channel(4);
        let conn = board.connect(tx);
        let ctx = Context::new(&conn, &board);

        let frame = Frame::decode(r#"{"event":"join-session","data":{"code":7}}"#).unwrap();
        let result = Registry::new().dispatch(&ctx, frame).await;
        assert!(matches!(result, Err(HandlerError::InvalidPayload(_))));

        let event = rx.try_recv().unwrap();
        assert_eq!(*event, ServerEvent::error("Invalid request"));
    }
}
