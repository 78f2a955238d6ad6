//! Connection-to-session bindings.
//!
//! A side table maps each connection id to the `(code, username)` it joined
//! as. Disconnects and leave requests resolve through this table, never
//! through client-supplied names, and every path that removes a binding is
//! idempotent so an explicit leave racing a socket close removes the user once.

use super::conn::ConnId;
use super::hub::Hub;
use crate::error::HandlerError;
use crate::store::{RosterChange, Session, SessionStore};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub code: String,
    pub username: String,
}

/// A completed leave: who left which session, and what became of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub code: String,
    pub username: String,
    pub change: RosterChange,
}

/// Result of [`Membership::join`].
#[derive(Debug)]
pub struct Joined {
    /// The session as it stood after the join, or `None` if it was ended
    /// before the binding took hold.
    pub session: Option<Session>,
    /// The session the connection was moved out of, if any.
    pub previous: Option<Departure>,
}

pub struct Membership {
    bindings: DashMap<ConnId, Binding>,
    store: Arc<dyn SessionStore>,
    hub: Arc<Hub>,
}

impl Membership {
    pub fn new(store: Arc<dyn SessionStore>, hub: Arc<Hub>) -> Self {
        Self {
            bindings: DashMap::new(),
            store,
            hub,
        }
    }

    pub fn binding(&self, conn: &str) -> Option<Binding> {
        self.bindings.get(conn).map(|b| b.value().clone())
    }

    /// Bind a connection whose user is already on the roster (the creator).
    pub fn attach(&self, conn: &str, code: &str, username: &str) {
        self.bindings.insert(
            conn.to_string(),
            Binding {
                code: code.to_string(),
                username: username.to_string(),
            },
        );
        self.hub.subscribe(code, conn);
    }

    /// Add `username` to the roster of `code` and bind the connection to it.
    ///
    /// A connection bound elsewhere is moved: the old binding is left only
    /// after the new roster accepted the user, so a failed join keeps the
    /// connection where it was. If leaving the old session fails, the new
    /// roster entry is taken back out before the error is returned.
    pub async fn join(&self, conn: &str, code: &str, username: &str) -> Result<Joined, HandlerError> {
        let session = self
            .store
            .add_user(code, username)
            .await?
            .ok_or_else(|| HandlerError::SessionNotFound(code.to_string()))?;

        let previous = match self.leave(conn, None).await {
            Ok(previous) => previous,
            Err(e) => {
                if let Err(undo) = self.store.remove_user(code, username).await {
                    warn!(code = %code, username = %username, error = %undo, "Failed to undo roster entry");
                }
                return Err(e);
            }
        };

        self.attach(conn, code, username);

        // The session may have been ended between `add_user` and `attach`,
        // in which case `dissolve` ran before this binding existed.
        let live = match self.store.find_by_code(code).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(code = %code, error = %e, "Could not confirm session after join");
                true
            }
        };
        if !live {
            self.detach(conn, code);
            return Ok(Joined {
                session: None,
                previous,
            });
        }

        Ok(Joined {
            session: Some(session),
            previous,
        })
    }

    /// Remove the connection's user from its session.
    ///
    /// With `only_code`, nothing happens unless the connection is bound to
    /// that session. Returns `None` when there was nothing to leave. The
    /// binding is dropped only once the store removed the user, so a failed
    /// call can be retried by a later leave or disconnect.
    pub async fn leave(
        &self,
        conn: &str,
        only_code: Option<&str>,
    ) -> Result<Option<Departure>, HandlerError> {
        let Some(binding) = self.binding(conn) else {
            return Ok(None);
        };
        if only_code.is_some_and(|code| code != binding.code) {
            return Ok(None);
        }

        let change = self
            .store
            .remove_user(&binding.code, &binding.username)
            .await?;

        // Whoever drops the binding reports the departure.
        if self
            .bindings
            .remove_if(conn, |_, current| *current == binding)
            .is_none()
        {
            return Ok(None);
        }
        self.hub.unsubscribe(&binding.code, conn);

        Ok(Some(Departure {
            code: binding.code,
            username: binding.username,
            change,
        }))
    }

    fn detach(&self, conn: &str, code: &str) {
        if self.bindings.remove_if(conn, |_, b| b.code == code).is_some() {
            self.hub.unsubscribe(code, conn);
        }
    }

    /// Unbind every subscriber of a session that no longer exists.
    pub fn dissolve(&self, code: &str) -> usize {
        let members = self.hub.close_room(code);
        for conn in &members {
            self.bindings.remove_if(conn, |_, b| b.code == code);
        }
        members.len()
    }
}
