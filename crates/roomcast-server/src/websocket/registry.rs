//! Room registry: membership, broadcast fan-out, and room lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::ids::{ParticipantId, RoomId};
use crate::metrics::{ROOMS_ACTIVE, ROOMS_CLOSED_TOTAL, SEND_FAILURES_TOTAL};

use super::participant::Participant;

type Members = HashMap<ParticipantId, Arc<Participant>>;

/// Authoritative store of room membership.
///
/// Rooms are created on first join and evicted the moment their last member
/// is removed; an empty room never survives an operation. All mutations go
/// through the single write lock, so membership updates cannot be lost under
/// concurrent joins, leaves, and broadcasts.
pub struct RoomRegistry {
    /// Active rooms by room ID. Invariant: every value is non-empty.
    rooms: RwLock<HashMap<RoomId, Members>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Add a participant to a room, creating the room on first join.
    ///
    /// Returns the member count after insertion.
    pub async fn join(&self, room_id: &RoomId, participant: Arc<Participant>) -> usize {
        let mut rooms = self.rooms.write().await;
        let is_new_room = !rooms.contains_key(room_id);
        let members = rooms.entry(room_id.clone()).or_default();
        let _ = members.insert(participant.id.clone(), participant);
        if is_new_room {
            gauge!(ROOMS_ACTIVE).increment(1.0);
        }
        members.len()
    }

    /// Remove one participant from a room, evicting the room if it empties.
    ///
    /// Returns the remaining member count, or `None` if the room or the
    /// participant was not present (already-removed is a no-op, not an
    /// error).
    pub async fn leave(&self, room_id: &RoomId, participant_id: &ParticipantId) -> Option<usize> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.get_mut(room_id)?;
        let _ = members.remove(participant_id)?;
        let remaining = members.len();
        if remaining == 0 {
            let _ = rooms.remove(room_id);
            gauge!(ROOMS_ACTIVE).decrement(1.0);
            info!(room_id = %room_id, "room removed after last participant left");
        }
        Some(remaining)
    }

    /// Fan a text payload out to every current member of a room.
    ///
    /// A missing room is a no-op. Members whose transport is already gone
    /// are skipped without a send attempt; members whose queue rejects the
    /// frame are logged at warn level. Both kinds are pruned afterwards, and
    /// the room is evicted if pruning empties it. One recipient's failure
    /// never aborts delivery to the rest, and nothing is reported to the
    /// caller.
    pub async fn broadcast(&self, room_id: &RoomId, message: &str) {
        let members: Vec<Arc<Participant>> = {
            let rooms = self.rooms.read().await;
            match rooms.get(room_id) {
                Some(members) => members.values().cloned().collect(),
                None => return,
            }
        };

        let payload: Arc<str> = Arc::from(message);
        let mut stale: Vec<ParticipantId> = Vec::new();
        for member in &members {
            if !member.is_connected() {
                stale.push(member.id.clone());
                continue;
            }
            if let Err(error) = member.send(Arc::clone(&payload)) {
                warn!(
                    room_id = %room_id,
                    participant_id = %member.id,
                    %error,
                    "failed to send message to participant"
                );
                counter!(SEND_FAILURES_TOTAL).increment(1);
                member.mark_disconnected();
                stale.push(member.id.clone());
            }
        }

        if stale.is_empty() {
            return;
        }

        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(room_id) {
            for participant_id in &stale {
                let _ = members.remove(participant_id);
            }
            if members.is_empty() {
                let _ = rooms.remove(room_id);
                gauge!(ROOMS_ACTIVE).decrement(1.0);
                info!(
                    room_id = %room_id,
                    "room removed after all participants disconnected during broadcast"
                );
            }
        }
    }

    /// Close every member's connection and drop the room.
    ///
    /// A missing room is a no-op. The room is detached from the registry
    /// first, then members are closed outside the lock; the room is absent
    /// on return regardless of individual close outcomes.
    pub async fn close_room(&self, room_id: &RoomId) {
        let members = {
            let mut rooms = self.rooms.write().await;
            match rooms.remove(room_id) {
                Some(members) => members,
                None => return,
            }
        };
        gauge!(ROOMS_ACTIVE).decrement(1.0);
        info!(room_id = %room_id, participants = members.len(), "closing room");

        for member in members.values() {
            if let Err(error) = member.close() {
                warn!(
                    room_id = %room_id,
                    participant_id = %member.id,
                    %error,
                    "failed to close participant connection"
                );
            }
        }

        counter!(ROOMS_CLOSED_TOTAL).increment(1);
        info!(room_id = %room_id, "room closed and removed");
    }

    /// Whether a room currently exists.
    pub async fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }

    /// Current member count of a room (`0` if absent).
    pub async fn room_size(&self, room_id: &RoomId) -> usize {
        self.rooms.read().await.get(room_id).map_or(0, Members::len)
    }

    /// Number of active rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Total participants across all rooms.
    pub async fn connection_count(&self) -> usize {
        self.rooms.read().await.values().map(Members::len).sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
