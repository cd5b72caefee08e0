//! Runs a single user turn and streams the agent's reply to the client.

use crate::{
    state::AppState,
    ws::{protocol::ServerMessage, session::send_msg},
};
use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use std::sync::Arc;
use study_partner_core::Command;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Handles one user reply.
///
/// The session is reserved for the whole turn, so a second connection on the
/// same session waits and then sees this turn's result. The conductor works
/// on a copy of the stored session, which is written back only when the turn
/// succeeds. A failed turn leaves the session untouched and is reported to the
/// client, so the student can simply retry.
///
/// Returns `true` once the discussion has terminated.
pub async fn handle_user_turn(
    state: &Arc<AppState>,
    session_id: Uuid,
    user_id: &str,
    user_text: &str,
    socket_tx: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
) -> Result<bool> {
    let _turn = state.store.begin_turn(session_id).await;
    let stored = state
        .store
        .get_session(session_id, user_id)
        .await
        .context("Session disappeared from the store")?;
    let mut discussion = stored.session;
    let phase_before = discussion.phase().label();

    let command = match state.conductor.respond(&mut discussion, user_text).await {
        Ok(command) => command,
        Err(e) => {
            warn!(error = ?e, "Turn failed; session left unchanged");
            send_msg(
                &mut *socket_tx.lock().await,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await?;
            return Ok(false);
        }
    };

    let phase_after = discussion.phase().label();
    state.store.save_session(session_id, discussion).await?;

    let mut sink = socket_tx.lock().await;
    send_msg(&mut sink, ServerMessage::ResponseStart).await?;
    send_msg(
        &mut sink,
        ServerMessage::ResponseChunk {
            chunk: command.text().to_string(),
        },
    )
    .await?;
    send_msg(&mut sink, ServerMessage::ResponseEnd).await?;

    if phase_before != phase_after {
        info!(from = phase_before, to = phase_after, "Phase changed");
        send_msg(
            &mut sink,
            ServerMessage::PhaseUpdate {
                phase: phase_after.to_string(),
            },
        )
        .await?;
    }

    if let Command::SessionComplete(message) = command {
        send_msg(&mut sink, ServerMessage::SessionComplete { message }).await?;
        return Ok(true);
    }
    Ok(false)
}
