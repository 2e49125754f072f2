//! Per-connection session lifecycle.
//!
//! Each accepted socket runs one session task: it joins the room named in
//! the request path, relays every inbound text frame to the whole room, and
//! on exit removes itself exactly once, letting the registry evict the room
//! when it empties. A dedicated writer task owns the socket's sink half and
//! drains the participant's outbound queue, so registry operations never
//! block on a slow peer.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::ServerConfig;
use crate::ids::{ParticipantId, RoomId};
use crate::metrics::{
    CONNECTION_DURATION_SECONDS, CONNECTIONS_ACTIVE, CONNECTIONS_TOTAL, DISCONNECTIONS_TOTAL,
    MESSAGES_RELAYED_TOTAL,
};

use super::participant::{OutboundFrame, Participant};
use super::registry::RoomRegistry;

/// Payload that ends the whole room when received verbatim (case-sensitive,
/// no trimming).
pub const DONE_SENTINEL: &str = "Done";

/// Notice broadcast to the room when a participant ends the conversation.
pub const CLOSE_NOTICE: &str = "Conversa encerrada por um dos participantes.";

/// Grace period for the writer task to flush queued frames during cleanup.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run one participant's session to completion.
///
/// Returns once the peer disconnects, the room is closed, or the server
/// shuts down, with the participant removed from the registry.
#[instrument(skip_all, fields(room_id = %room_id, participant_id = %participant_id))]
pub async fn run_room_session(
    socket: WebSocket,
    room_id: RoomId,
    participant_id: ParticipantId,
    registry: Arc<RoomRegistry>,
    config: ServerConfig,
    shutdown: CancellationToken,
) {
    counter!(CONNECTIONS_TOTAL).increment(1);
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (send_tx, mut send_rx) = mpsc::channel::<OutboundFrame>(config.send_queue_capacity);
    let participant = Arc::new(Participant::new(participant_id, send_tx));

    let total = registry.join(&room_id, Arc::clone(&participant)).await;
    info!(participants = total, "participant connected");

    // Writer task: owns the sink half, drains the outbound queue, and emits
    // keepalive pings. Exits on write failure, a queued close frame, or the
    // queue closing (the last participant handle dropped).
    let mut ping_interval =
        tokio::time::interval(Duration::from_secs(config.ping_interval_secs));
    let mut writer = tokio::spawn(async move {
        // The first tick completes immediately; swallow it.
        let _ = ping_interval.tick().await;
        loop {
            tokio::select! {
                frame = send_rx.recv() => match frame {
                    Some(OutboundFrame::Text(text)) => {
                        if ws_tx.send(Message::Text(text.as_ref().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(OutboundFrame::Close) => {
                        let frame = CloseFrame {
                            code: close_code::NORMAL,
                            reason: "".into(),
                        };
                        let _ = ws_tx.send(Message::Close(Some(frame))).await;
                        break;
                    }
                    None => break,
                },
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("server shutting down, closing session");
                let _ = participant.close();
                break;
            }
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str();
                    debug!(message = %text, "received message");
                    if text == DONE_SENTINEL {
                        info!("conversation ended by a participant");
                        registry.broadcast(&room_id, CLOSE_NOTICE).await;
                        registry.close_room(&room_id).await;
                        break;
                    }
                    counter!(MESSAGES_RELAYED_TOTAL).increment(1);
                    registry.broadcast(&room_id, text).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!("ignoring binary frame");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    info!("participant sent close frame");
                    participant.mark_disconnected();
                    break;
                }
                Some(Err(error)) => {
                    debug!(error = %error, "websocket receive error");
                    participant.mark_disconnected();
                    break;
                }
                None => {
                    info!("participant disconnected");
                    participant.mark_disconnected();
                    break;
                }
            }
        }
    }

    // Cleanup runs exactly once, whichever way the loop exited. If the room
    // was already closed or this participant already pruned, leave is a
    // no-op.
    participant.mark_disconnected();
    if let Some(remaining) = registry.leave(&room_id, &participant.id).await {
        info!(remaining, "participant removed from room");
    }
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
    counter!(DISCONNECTIONS_TOTAL).increment(1);
    histogram!(CONNECTION_DURATION_SECONDS).record(participant.age().as_secs_f64());

    // Drop the last queue handle so the writer drains what is already queued
    // (a close notice, the close frame itself) and exits; only a stalled
    // peer gets aborted.
    drop(participant);
    if tokio::time::timeout(DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    info!("session ended");
}
