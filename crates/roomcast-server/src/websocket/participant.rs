//! Per-connection participant state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::ids::ParticipantId;

/// Frame queued for a participant's outbound writer task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Relay a text payload to the peer.
    Text(Arc<str>),
    /// Close the socket gracefully with a normal-closure code.
    Close,
}

/// Failure to enqueue a frame for delivery to a participant.
///
/// The registry treats both kinds as a signal to evict the recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// The outbound writer is gone; the socket is closed or closing.
    #[error("outbound queue closed")]
    Closed,
    /// The outbound queue is saturated; the peer is not draining frames.
    #[error("outbound queue full")]
    Full,
}

/// Represents one connected participant.
pub struct Participant {
    /// Unique connection ID.
    pub id: ParticipantId,
    /// Send channel to the participant's WebSocket write task.
    tx: mpsc::Sender<OutboundFrame>,
    /// When this participant connected.
    pub connected_at: Instant,
    /// Cleared once the transport reports the peer gone or a close is queued.
    is_alive: AtomicBool,
    /// Count of frames dropped due to a full or closed queue.
    dropped_frames: AtomicU64,
}

impl Participant {
    /// Create a new participant handle.
    pub fn new(id: ParticipantId, tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            is_alive: AtomicBool::new(true),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Queue a text payload for delivery to the peer.
    pub fn send(&self, message: Arc<str>) -> Result<(), SendError> {
        self.enqueue(OutboundFrame::Text(message))
    }

    /// Queue a graceful close and mark the participant dead.
    ///
    /// The writer task sends the actual close frame; even if queueing fails
    /// the participant no longer reports as connected.
    pub fn close(&self) -> Result<(), SendError> {
        self.is_alive.store(false, Ordering::Relaxed);
        self.enqueue(OutboundFrame::Close)
    }

    fn enqueue(&self, frame: OutboundFrame) -> Result<(), SendError> {
        self.tx.try_send(frame).map_err(|err| {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            match err {
                TrySendError::Full(_) => SendError::Full,
                TrySendError::Closed(_) => SendError::Closed,
            }
        })
    }

    /// Whether the peer is still reachable as far as the server knows.
    pub fn is_connected(&self) -> bool {
        self.is_alive.load(Ordering::Relaxed) && !self.tx.is_closed()
    }

    /// Record that the transport reported this peer gone.
    pub fn mark_disconnected(&self) {
        self.is_alive.store(false, Ordering::Relaxed);
    }

    /// Total frames dropped for this participant.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_participant() -> (Participant, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(32);
        let participant = Participant::new(ParticipantId::from("conn_1"), tx);
        (participant, rx)
    }

    #[test]
    fn create_participant() {
        let (p, _rx) = make_participant();
        assert_eq!(p.id.as_str(), "conn_1");
        assert!(p.is_connected());
        assert_eq!(p.drop_count(), 0);
    }

    #[tokio::test]
    async fn send_frame_success() {
        let (p, mut rx) = make_participant();
        p.send(Arc::from("hello")).unwrap();
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame, OutboundFrame::Text(Arc::from("hello")));
    }

    #[tokio::test]
    async fn send_to_closed_queue_returns_closed() {
        let (tx, rx) = mpsc::channel(32);
        let p = Participant::new(ParticipantId::from("conn_2"), tx);
        drop(rx);
        assert_eq!(p.send(Arc::from("hello")), Err(SendError::Closed));
        assert_eq!(p.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_to_full_queue_returns_full() {
        let (tx, _rx) = mpsc::channel(1);
        let p = Participant::new(ParticipantId::from("conn_3"), tx);
        p.send(Arc::from("msg1")).unwrap();
        // Queue is now full
        assert_eq!(p.send(Arc::from("msg2")), Err(SendError::Full));
        assert_eq!(p.drop_count(), 1);
    }

    #[tokio::test]
    async fn close_queues_close_frame_and_marks_dead() {
        let (p, mut rx) = make_participant();
        p.close().unwrap();
        assert!(!p.is_connected());
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame, OutboundFrame::Close);
    }

    #[tokio::test]
    async fn close_on_closed_queue_still_marks_dead() {
        let (tx, rx) = mpsc::channel(32);
        let p = Participant::new(ParticipantId::from("conn_4"), tx);
        drop(rx);
        assert_eq!(p.close(), Err(SendError::Closed));
        assert!(!p.is_connected());
    }

    #[test]
    fn mark_disconnected_flips_liveness() {
        let (p, _rx) = make_participant();
        assert!(p.is_connected());
        p.mark_disconnected();
        assert!(!p.is_connected());
    }

    #[tokio::test]
    async fn receiver_drop_reports_not_connected() {
        let (tx, rx) = mpsc::channel(32);
        let p = Participant::new(ParticipantId::from("conn_5"), tx);
        assert!(p.is_connected());
        drop(rx);
        assert!(!p.is_connected());
    }

    #[tokio::test]
    async fn send_multiple_frames_in_order() {
        let (p, mut rx) = make_participant();
        for i in 0..5 {
            p.send(Arc::from(format!("msg_{i}").as_str())).unwrap();
        }
        for i in 0..5 {
            let frame = rx.recv().await.unwrap();
            assert_eq!(frame, OutboundFrame::Text(Arc::from(format!("msg_{i}").as_str())));
        }
    }

    #[tokio::test]
    async fn send_empty_payload() {
        let (p, mut rx) = make_participant();
        p.send(Arc::from("")).unwrap();
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame, OutboundFrame::Text(Arc::from("")));
    }

    #[test]
    fn age_increases() {
        let (p, _rx) = make_participant();
        let age1 = p.age();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let age2 = p.age();
        assert!(age2 > age1);
    }
}
