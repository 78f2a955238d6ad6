//! Board event handlers.
//!
//! One handler per inbound client event, registered by event name in the
//! [`Registry`]. Handlers mutate sessions only through the store's atomic
//! operations and reach other connections only through the hub.

mod core;
mod ideas;
mod membership;
mod session;

pub use self::core::{Context, Handler, Registry};
pub use membership::disconnect;

#[cfg(test)]
pub(crate) mod test_support {
    //! Fake connections for driving handlers without a socket.

    use super::{Context, Registry};
    use crate::error::HandlerResult;
    use crate::state::{Board, ConnId};
    use std::sync::Arc;
    use stormer_proto::{ClientEvent, Frame, ServerEvent, encode};
    use tokio::sync::mpsc;

    pub struct FakeClient {
        pub conn: ConnId,
        rx: mpsc::Receiver<Arc<ServerEvent>>,
    }

    impl FakeClient {
        pub fn connect(board: &Arc<Board>) -> Self {
            let (tx, rx) = mpsc::channel(64);
            let conn = board.connect(tx);
            Self { conn, rx }
        }

        pub async fn send(
            &self,
            board: &Arc<Board>,
            registry: &Registry,
            event: ClientEvent,
        ) -> HandlerResult {
            let frame = Frame::decode(&encode(&event).unwrap()).unwrap();
            registry.dispatch(&Context::new(&self.conn, board), frame).await
        }

        /// Next queued event, failing the test if there is none.
        pub fn recv(&mut self) -> ServerEvent {
            match self.rx.try_recv() {
                Ok(event) => (*event).clone(),
                Err(e) => panic!("{} expected an event: {e}", self.conn),
            }
        }

        pub fn assert_silent(&mut self) {
            if let Ok(event) = self.rx.try_recv() {
                panic!("{} got unexpected {event:?}", self.conn);
            }
        }
    }
}
