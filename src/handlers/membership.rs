//! Join, leave, and disconnect.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::state::{Board, Departure};
use crate::store::RosterChange;
use async_trait::async_trait;
use stormer_proto::{
    normalize_code, Frame, JoinSession, LeaveSession, Roster, ServerEvent, SessionJoined,
};
use tracing::{debug, info};

pub struct JoinSessionHandler;

#[async_trait]
impl Handler for JoinSessionHandler {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let JoinSession { username, code } = frame.payload()?;
        let username = username.trim();
        if username.is_empty() {
            return Err(HandlerError::MissingUsername);
        }
        let code = normalize_code(&code).ok_or_else(|| HandlerError::SessionNotFound(code))?;

        if let Some(binding) = ctx.binding()
            && binding.code == code
        {
            return resend_joined(ctx, &binding.code, &binding.username).await;
        }

        let joined = ctx.board.membership.join(ctx.conn_id, &code, username).await?;
        if let Some(previous) = joined.previous {
            announce(ctx.board, ctx.conn_id, previous);
        }
        let Some(session) = joined.session else {
            return Err(HandlerError::SessionNotFound(code));
        };
        info!(conn = %ctx.conn_id, code = %code, username = %username, "User joined session");

        ctx.reply(ServerEvent::SessionJoined(SessionJoined {
            code: session.code.clone(),
            username: username.to_string(),
            topic: session.topic,
            template: session.template,
            users: session.users.clone(),
            ideas: session.ideas,
        }));
        ctx.board.hub.broadcast(
            &code,
            ServerEvent::UserJoined(Roster {
                users: session.users,
            }),
            Some(ctx.conn_id),
        );
        Ok(())
    }
}

/// A connection asking to join the session it is already in just gets the
/// current state again.
async fn resend_joined(ctx: &Context<'_>, code: &str, username: &str) -> HandlerResult {
    let session = ctx
        .board
        .store
        .find_by_code(code)
        .await?
        .ok_or_else(|| HandlerError::SessionNotFound(code.to_string()))?;
    debug!(conn = %ctx.conn_id, code = %code, "Repeated join for current session");
    ctx.reply(ServerEvent::SessionJoined(SessionJoined {
        code: session.code,
        username: username.to_string(),
        topic: session.topic,
        template: session.template,
        users: session.users,
        ideas: session.ideas,
    }));
    Ok(())
}

pub struct LeaveSessionHandler;

#[async_trait]
impl Handler for LeaveSessionHandler {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let LeaveSession { session, .. } = frame.payload()?;
        let code = normalize_code(&session).unwrap_or(session);
        if !depart(ctx.board, ctx.conn_id, Some(&code)).await? {
            debug!(conn = %ctx.conn_id, code = %code, "Leave for a session this connection is not in");
        }
        Ok(())
    }
}

/// Run the leave transition for a closed connection.
pub async fn disconnect(board: &Board, conn: &str) -> HandlerResult {
    depart(board, conn, None).await.map(|_| ())
}

/// Remove the connection's user from its session and tell whoever is left.
///
/// Returns false when the connection was not bound (or not to `only_code`).
pub(super) async fn depart(
    board: &Board,
    conn: &str,
    only_code: Option<&str>,
) -> Result<bool, HandlerError> {
    match board.membership.leave(conn, only_code).await? {
        Some(departure) => {
            announce(board, conn, departure);
            Ok(true)
        }
        None => Ok(false),
    }
}

fn announce(board: &Board, conn: &str, departure: Departure) {
    match departure.change {
        RosterChange::Remaining(users) => {
            info!(conn = %conn, code = %departure.code, username = %departure.username, "User left session");
            board
                .hub
                .broadcast(&departure.code, ServerEvent::UserLeft(Roster { users }), None);
        }
        RosterChange::Closed => {
            info!(code = %departure.code, username = %departure.username, "Last user left, session deleted");
            board.membership.dissolve(&departure.code);
        }
        RosterChange::Missing => {
            debug!(code = %departure.code, "Left a session that no longer exists");
        }
    }
}
