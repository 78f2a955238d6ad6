//! Board content: new ideas and to-do toggles.

use super::{Context, Handler};
use crate::error::HandlerResult;
use async_trait::async_trait;
use stormer_proto::{Frame, NewIdea, ServerEvent, SharedIdea, ToggleTodo, normalize_code};
use tracing::debug;

pub struct NewIdeaHandler;

#[async_trait]
impl Handler for NewIdeaHandler {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let NewIdea { session, idea } = frame.payload()?;
        let code = normalize_code(&session).unwrap_or(session);

        if let Err(e) = idea.validate() {
            if ctx.board.store.find_by_code(&code).await?.is_none() {
                debug!(conn = %ctx.conn_id, code = %code, "Invalid idea for unknown session ignored");
                return Ok(());
            }
            return Err(e.into());
        }

        let Some(idea) = ctx.board.store.push_idea(&code, idea).await? else {
            debug!(conn = %ctx.conn_id, code = %code, "Idea for unknown session ignored");
            return Ok(());
        };

        debug!(conn = %ctx.conn_id, code = %code, kind = ?idea.kind, "Idea shared");
        ctx.board.hub.broadcast(
            &code,
            ServerEvent::NewIdeaShared(SharedIdea {
                session: code.clone(),
                idea,
            }),
            None,
        );
        Ok(())
    }
}

pub struct ToggleTodoHandler;

#[async_trait]
impl Handler for ToggleTodoHandler {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let ToggleTodo { id, session } = frame.payload()?;
        let code = normalize_code(&session).unwrap_or(session);

        let Some(idea) = ctx.board.store.toggle_todo(&code, &id).await? else {
            debug!(conn = %ctx.conn_id, code = %code, id = %id, "Toggle for unknown to-do ignored");
            return Ok(());
        };

        ctx.board.hub.broadcast(
            &code,
            ServerEvent::TodoUpdated(SharedIdea {
                session: code.clone(),
                idea,
            }),
            None,
        );
        Ok(())
    }
}
