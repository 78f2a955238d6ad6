//! Session lifecycle: create, read, end.

use super::membership::depart;
use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::store::Session;
use async_trait::async_trait;
use chrono::Utc;
use stormer_proto::{
    CreateSession, EndSession, Frame, RequestSessionData, ServerEvent, SessionCreated,
    SessionData, normalize_code,
};
use tracing::{debug, info};

pub const HOST_ENDED_MESSAGE: &str = "The host has ended this session.";

pub struct CreateSessionHandler;

#[async_trait]
impl Handler for CreateSessionHandler {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let CreateSession {
            username,
            topic,
            template,
        } = frame.payload()?;
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(HandlerError::MissingUsername);
        }
        let topic = topic.trim().to_string();
        if topic.is_empty() {
            return Err(HandlerError::MissingTopic);
        }

        depart(ctx.board, ctx.conn_id, None).await?;

        let host = ctx.conn_id.to_string();
        let session = ctx
            .board
            .codes
            .create_session(ctx.board.store.as_ref(), |code| {
                Session::new(code, topic.clone(), template, host.clone(), username.clone())
            })
            .await?;

        ctx.board
            .membership
            .attach(ctx.conn_id, &session.code, &username);
        crate::metrics::record_session_created();
        info!(
            conn = %ctx.conn_id,
            code = %session.code,
            username = %username,
            template = %session.template,
            "Session created"
        );

        ctx.reply(ServerEvent::SessionCreated(SessionCreated {
            code: session.code,
            username,
            topic: session.topic,
            template: session.template,
            users: session.users,
        }));
        Ok(())
    }
}

pub struct RequestSessionDataHandler;

#[async_trait]
impl Handler for RequestSessionDataHandler {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let RequestSessionData { session } = frame.payload()?;
        let code = normalize_code(&session).unwrap_or(session);

        let Some(session) = ctx.board.store.find_by_code(&code).await? else {
            debug!(conn = %ctx.conn_id, code = %code, "Session data requested for unknown session");
            return Ok(());
        };

        ctx.reply(ServerEvent::SessionData(SessionData {
            code: session.code,
            topic: session.topic,
            template: session.template,
            users: session.users,
            ideas: session.ideas,
            timestamp: Utc::now(),
        }));
        Ok(())
    }
}

pub struct EndSessionHandler;

#[async_trait]
impl Handler for EndSessionHandler {
    async fn handle(&self, ctx: &Context<'_>, frame: Frame) -> HandlerResult {
        let EndSession { session, .. } = frame.payload()?;
        let code = normalize_code(&session).unwrap_or(session);

        let Some(session) = ctx.board.store.find_by_code(&code).await? else {
            debug!(conn = %ctx.conn_id, code = %code, "End requested for unknown session");
            return Ok(());
        };
        // Host authority is the connection that created the session.
        if session.host != ctx.conn_id {
            return Err(HandlerError::Unauthorized(code));
        }

        ctx.board.store.delete(&code).await?;
        ctx.board.end_session(&code, HOST_ENDED_MESSAGE);
        Ok(())
    }
}
