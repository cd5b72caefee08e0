//! Manages the primary WebSocket connection lifecycle for a discussion.

use super::{
    cycle::handle_user_turn,
    protocol::{ClientMessage, ServerMessage},
};
use crate::{state::AppState, store::StoredSession};
use anyhow::{Context, Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Performs the `init` handshake that attaches the connection to a stored
/// session, then spawns the discussion loop.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let temp_id: u32 = rand::random();
    tracing::Span::current().record("session_id", temp_id.to_string());
    info!("New WebSocket connection. Awaiting initialization...");

    let (socket_tx, mut socket_rx) = socket.split();
    let socket_tx = Arc::new(Mutex::new(socket_tx));

    let Some(first) = socket_rx.next().await else {
        info!("Client disconnected before sending init message.");
        return;
    };
    let initialized = match first {
        Ok(Message::Text(text)) => initialize_session(&text, &state).await,
        Ok(_) => Err(anyhow!("First message was not a text `init` message.")),
        Err(e) => Err(anyhow!(e)),
    };
    let stored = match initialized {
        Ok(stored) => stored,
        Err(e) => {
            error!("Session initialization failed: {:?}", e);
            let _ = send_msg(
                &mut *socket_tx.lock().await,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    if send_msg(
        &mut *socket_tx.lock().await,
        ServerMessage::Initialized {
            session_id: stored.id,
            phase: stored.session.phase().label().to_string(),
            history: stored.messages(),
        },
    )
    .await
    .is_err()
    {
        error!("Failed to send Initialized message to client.");
        return;
    }

    let session_span = tracing::info_span!(
        "discussion",
        session_id = %stored.id,
        subject = %stored.session.scenario().subject
    );
    tokio::spawn(
        async move {
            if let Err(e) = run_discussion(state, socket_tx, socket_rx, stored).await {
                error!(error = ?e, "Discussion terminated with error.");
            }
            info!("Discussion finished.");
        }
        .instrument(session_span),
    );
}

/// Parses the `init` message and loads the matching session from the store.
async fn initialize_session(init_text: &str, state: &Arc<AppState>) -> Result<StoredSession> {
    let init_msg: ClientMessage =
        serde_json::from_str(init_text).context("Could not parse `init` message")?;
    let ClientMessage::Init {
        session_id,
        user_id,
    } = init_msg
    else {
        return Err(anyhow!("First message must be `init`"));
    };

    tracing::Span::current().record("session_id", session_id.to_string());
    info!("Resuming existing session");

    state
        .store
        .get_session(session_id, &user_id)
        .await
        .with_context(|| format!("Session '{}' not found", session_id))
}

/// The main event loop for an attached WebSocket.
///
/// Messages are handled one at a time, so a session never sees two
/// overlapping turns.
async fn run_discussion(
    state: Arc<AppState>,
    socket_tx: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    mut socket_rx: SplitStream<WebSocket>,
    stored: StoredSession,
) -> Result<()> {
    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::UserMessage { text }) => {
                    let complete =
                        handle_user_turn(&state, stored.id, &stored.user_id, &text, &socket_tx)
                            .await?;
                    if complete {
                        info!("Discussion reached its end.");
                        break;
                    }
                }
                Ok(ClientMessage::Init { .. }) => {
                    warn!("Ignoring repeated `init` message.");
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring unparseable client message.");
                    send_msg(
                        &mut *socket_tx.lock().await,
                        ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                        },
                    )
                    .await?;
                }
            },
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary frame; only text messages are supported.");
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                break;
            }
        }
    }

    info!("WebSocket connection closed.");
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
