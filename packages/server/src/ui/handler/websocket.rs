//! WebSocket connection handlers.
//!
//! One task per connection drives the session state machine:
//!
//! 1. Register the session (close with 1013 when the registry is full)
//! 2. Wait for the identity frame within the identity timeout
//! 3. Handle chat frames and `GET_HISTORY` until the peer leaves, the
//!    transport fails or the server shuts down
//!
//! Outbound frames go through the session's bounded queue and are written by a
//! separate writer task (`pusher_loop`), so broadcasts never wait on this
//! peer's socket. A peer whose queue overflows is closed with 1008.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    domain::{CloseReason, OutboundFrame, OutboundQueue, PusherChannel, Session, SessionState},
    infrastructure::codec::{InboundFrame, decode_inbound},
    ui::{close_code, state::AppState},
    usecase::{ConnectError, IdentifyError},
};

/// Upper bound for flushing queued frames (and the close frame) on exit
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    tracing::debug!("WebSocket upgrade requested from {}", peer_addr);
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer_addr))
}

/// Spawns a task that receives frames from the rx channel and pushes them to the WebSocket sender.
///
/// The task ends after writing a close frame, when every sender of the queue
/// is dropped, or when the socket rejects a write.
fn pusher_loop(
    mut rx: OutboundQueue,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if let Err(e) = sender.send(Message::Text(text.into())).await {
                        tracing::debug!("Writer stopped: {}", e);
                        return;
                    }
                }
                OutboundFrame::Batch(texts) => {
                    for text in texts {
                        if let Err(e) = sender.send(Message::Text(text.into())).await {
                            tracing::debug!("Writer stopped: {}", e);
                            return;
                        }
                    }
                }
                OutboundFrame::Close { code, reason } => {
                    send_close(&mut sender, code, reason).await;
                    return;
                }
            }
        }
        let _ = sender.close().await;
    })
}

/// Send a close frame with an application close code.
async fn send_close(sender: &mut SplitSink<WebSocket, Message>, code: u16, reason: String) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    if let Err(e) = sender.send(Message::Close(Some(frame))).await {
        tracing::debug!("Failed to send close frame ({}): {}", code, e);
    }
}

/// Resolves once the shutdown flag is set (or its sender is gone).
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// What a received WebSocket message means for the session
enum Incoming {
    Text(String),
    NotUtf8,
    Control,
    Closed,
}

fn classify(message: Message) -> Incoming {
    match message {
        Message::Text(text) => Incoming::Text(text.as_str().to_string()),
        Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Incoming::Text(text),
            Err(_) => Incoming::NotUtf8,
        },
        Message::Ping(_) | Message::Pong(_) => Incoming::Control,
        Message::Close(_) => Incoming::Closed,
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, peer_addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    // Create a bounded queue for this session's outbound frames
    let (tx, rx) = PusherChannel::bounded(state.outbound_queue_capacity);

    // Use ConnectSessionUseCase to register the session
    let (mut session, guard) = match state.connect_session_usecase.execute(peer_addr, tx.clone())
    {
        Ok(registered) => registered,
        Err(ConnectError::CapacityExceeded { max }) => {
            tracing::warn!(
                "Rejecting connection from {}: session capacity ({}) reached",
                peer_addr,
                max
            );
            send_close(
                &mut sender,
                close_code::TRY_AGAIN_LATER,
                "server is full".to_string(),
            )
            .await;
            return;
        }
    };

    // Spawn a task to write queued frames to this peer
    let mut writer = pusher_loop(rx, sender);

    let reason = drive_session(&state, &mut session, &tx, &mut receiver, &mut writer).await;
    let mut writer_finished = reason == CloseReason::WriterFailed;

    if let Some(code) = close_code::for_reason(reason) {
        let queued = tx.try_push(OutboundFrame::Close {
            code,
            reason: reason.description().to_string(),
        });
        if let Err(e) = queued {
            tracing::debug!(
                "Could not queue close frame for session '{}': {}",
                session.id(),
                e
            );
            // 溢れたキューを書き出す意味はない
            if reason == CloseReason::SlowConsumer {
                writer.abort();
                writer_finished = true;
            }
        }
    }

    // Use DisconnectSessionUseCase to move to Closed and leave the registry
    state.disconnect_session_usecase.execute(&mut session, reason);

    // Flush what is still queued (including the close frame)
    drop(tx);
    if !writer_finished
        && tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer)
            .await
            .is_err()
    {
        tracing::warn!(
            "Writer for session '{}' did not finish in time, aborting",
            session.id()
        );
        writer.abort();
    }

    drop(guard);
}

/// Runs the session until it has to close and returns the reason.
async fn drive_session(
    state: &AppState,
    session: &mut Session,
    outbound: &PusherChannel,
    receiver: &mut SplitStream<WebSocket>,
    writer: &mut JoinHandle<()>,
) -> CloseReason {
    let mut shutdown = state.shutdown.clone();
    let identity_deadline = tokio::time::sleep(state.identity_timeout);
    tokio::pin!(identity_deadline);

    loop {
        let awaiting = session.state() == SessionState::AwaitingUsername;

        tokio::select! {
            _ = &mut identity_deadline, if awaiting => {
                tracing::warn!(
                    "Session '{}' from {} sent no username within {:?}",
                    session.id(),
                    session.peer_addr(),
                    state.identity_timeout
                );
                return CloseReason::IdentityTimeout;
            }
            _ = wait_for_shutdown(&mut shutdown) => {
                return CloseReason::ServerShutdown;
            }
            _ = &mut *writer => {
                tracing::warn!("Writer for session '{}' stopped", session.id());
                return CloseReason::WriterFailed;
            }
            _ = outbound.overflowed() => {
                tracing::warn!(
                    "Outbound queue of session '{}' overflowed, closing it",
                    session.id()
                );
                return CloseReason::SlowConsumer;
            }
            incoming = receiver.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error on session '{}': {}", session.id(), e);
                        return CloseReason::TransportError;
                    }
                    None => return CloseReason::PeerClosed,
                };

                let text = match classify(message) {
                    Incoming::Text(text) => Some(text),
                    Incoming::NotUtf8 => None,
                    Incoming::Control => continue,
                    Incoming::Closed => {
                        tracing::info!("Session '{}' requested close", session.id());
                        return CloseReason::PeerClosed;
                    }
                };

                let outcome = if awaiting {
                    handle_identity(state, session, text).await
                } else {
                    handle_active(state, session, text).await;
                    None
                };
                if let Some(reason) = outcome {
                    return reason;
                }
            }
        }
    }
}

/// Handles the first frame of a session. Returns a reason when the session must close.
async fn handle_identity(
    state: &AppState,
    session: &mut Session,
    text: Option<String>,
) -> Option<CloseReason> {
    let Some(text) = text else {
        tracing::warn!("Session '{}' sent a non UTF-8 identity frame", session.id());
        return Some(CloseReason::MalformedIdentity);
    };

    match state.identify_session_usecase.execute(session, &text).await {
        Ok(_) => None,
        Err(IdentifyError::DuplicateUsername(name)) => {
            tracing::warn!(
                "Username '{}' is already in use. Rejecting session '{}'.",
                name,
                session.id()
            );
            Some(CloseReason::DuplicateUsername)
        }
        Err(e @ (IdentifyError::Malformed(_) | IdentifyError::InvalidUsername(_))) => {
            tracing::warn!("Invalid identity from session '{}': {}", session.id(), e);
            Some(CloseReason::MalformedIdentity)
        }
        Err(e @ (IdentifyError::InvalidState(_) | IdentifyError::SessionNotFound)) => {
            tracing::error!("Failed to identify session '{}': {}", session.id(), e);
            Some(CloseReason::TransportError)
        }
    }
}

/// Handles one frame of an active session. Malformed frames are logged and skipped.
async fn handle_active(state: &AppState, session: &Session, text: Option<String>) {
    let Some(text) = text else {
        tracing::warn!("Skipping non UTF-8 frame from session '{}'", session.id());
        return;
    };
    tracing::debug!("Received frame from session '{}': {}", session.id(), text);

    match decode_inbound(&text) {
        Ok(InboundFrame::GetHistory) => {
            if let Err(e) = state.get_history_usecase.execute(&session.id()).await {
                tracing::error!("Failed to resend history to '{}': {}", session.id(), e);
            }
        }
        Ok(InboundFrame::Chat(envelope)) => {
            // Use SendMessageUseCase to persist and broadcast
            if let Err(e) = state.send_message_usecase.execute(session, envelope).await {
                tracing::warn!("Failed to send message from '{}': {}", session.id(), e);
            }
        }
        Err(e) => {
            tracing::warn!("Skipping malformed frame from '{}': {}", session.id(), e);
        }
    }
}
