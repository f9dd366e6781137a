//! Room registry: which connections sit in which room

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use super::code::RoomCode;

/// Connection identifier assigned by the WebSocket handler
pub type ConnId = Uuid;

/// Which seat a participant occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    /// Room creator, spawns on the left
    Player1,
    /// Second joiner, spawns on the right
    Player2,
}

/// A pairing session with at most two participants
#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub player1: Option<ConnId>,
    pub player2: Option<ConnId>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    fn new(code: RoomCode, creator: ConnId) -> Self {
        Self {
            code,
            player1: Some(creator),
            player2: None,
            created_at: Utc::now(),
        }
    }

    pub fn seat_of(&self, conn_id: ConnId) -> Option<Seat> {
        if self.player1 == Some(conn_id) {
            Some(Seat::Player1)
        } else if self.player2 == Some(conn_id) {
            Some(Seat::Player2)
        } else {
            None
        }
    }

    /// The other participant, if both seats are filled
    pub fn peer_of(&self, conn_id: ConnId) -> Option<ConnId> {
        match self.seat_of(conn_id)? {
            Seat::Player1 => self.player2,
            Seat::Player2 => self.player1,
        }
    }

    pub fn participant_count(&self) -> usize {
        usize::from(self.player1.is_some()) + usize::from(self.player2.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.participant_count() == 0
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            participants: self.participant_count(),
            waiting_for_peer: self.player2.is_none(),
            created_at: self.created_at,
        }
    }
}

/// Public view of a room for HTTP introspection
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub code: RoomCode,
    pub participants: usize,
    pub waiting_for_peer: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of a leave request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The participant vacated its seat; `destroyed` when the room emptied
    Left { seat: Seat, destroyed: bool },
    /// The connection was not seated in that room
    NotSeated,
}

/// Room create/join rejections. The display text is sent verbatim to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Invalid room code")]
    InvalidCode,

    #[error("Room {0} already exists")]
    AlreadyExists(RoomCode),

    #[error("Room {0} does not exist")]
    NotFound(RoomCode),

    #[error("Room {0} is full")]
    Full(RoomCode),

    #[error("Already in room {0}")]
    AlreadyInRoom(RoomCode),
}

/// Registry of all active rooms
pub struct RoomRegistry {
    rooms: DashMap<RoomCode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Register a new room with `creator` in the first seat
    pub fn create(&self, code: RoomCode, creator: ConnId) -> Result<(), RoomError> {
        match self.rooms.entry(code.clone()) {
            Entry::Occupied(_) => Err(RoomError::AlreadyExists(code)),
            Entry::Vacant(slot) => {
                slot.insert(Room::new(code, creator));
                Ok(())
            }
        }
    }

    /// Seat `joiner` in the second seat. Returns the creator to notify, if still present.
    pub fn join(&self, code: &RoomCode, joiner: ConnId) -> Result<Option<ConnId>, RoomError> {
        let mut room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        if room.seat_of(joiner).is_some() {
            return Err(RoomError::AlreadyInRoom(code.clone()));
        }
        if room.player2.is_some() {
            return Err(RoomError::Full(code.clone()));
        }

        room.player2 = Some(joiner);
        Ok(room.player1)
    }

    pub fn seat_of(&self, code: &RoomCode, conn_id: ConnId) -> Option<Seat> {
        self.rooms.get(code).and_then(|room| room.seat_of(conn_id))
    }

    pub fn peer_of(&self, code: &RoomCode, conn_id: ConnId) -> Option<ConnId> {
        self.rooms.get(code).and_then(|room| room.peer_of(conn_id))
    }

    /// Vacate `conn_id`'s seat, removing the room once nobody is left
    pub fn leave(&self, code: &RoomCode, conn_id: ConnId) -> LeaveOutcome {
        let seat = {
            let Some(mut room) = self.rooms.get_mut(code) else {
                return LeaveOutcome::NotSeated;
            };
            let Some(seat) = room.seat_of(conn_id) else {
                return LeaveOutcome::NotSeated;
            };
            match seat {
                Seat::Player1 => room.player1 = None,
                Seat::Player2 => room.player2 = None,
            }
            seat
        };

        let destroyed = self
            .rooms
            .remove_if(code, |_, room| room.is_empty())
            .is_some();

        LeaveOutcome::Left { seat, destroyed }
    }

    pub fn get(&self, code: &RoomCode) -> Option<RoomSummary> {
        self.rooms.get(code).map(|room| room.summary())
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_participants(&self) -> usize {
        self.rooms.iter().map(|r| r.value().participant_count()).sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
