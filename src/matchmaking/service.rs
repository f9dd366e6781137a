//! Relay service - routes room and position events between paired connections

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::code::RoomCode;
use super::rooms::{ConnId, LeaveOutcome, RoomError, RoomRegistry, RoomSummary};

/// Outbound queue depth per connection
pub const OUTBOUND_BUFFER: usize = 64;

/// Connection handle for routing messages to one client
#[derive(Clone)]
pub struct ClientConnection {
    pub conn_id: ConnId,
    /// Channel drained by the connection's writer task
    pub outbound_tx: mpsc::Sender<ServerMsg>,
}

/// Relay service
pub struct RelayService {
    rooms: Arc<RoomRegistry>,
    /// Connected clients
    connections: DashMap<ConnId, ClientConnection>,
    /// Map of connection -> room it is seated in
    conn_rooms: DashMap<ConnId, RoomCode>,
}

impl RelayService {
    pub fn new(rooms: Arc<RoomRegistry>) -> Self {
        Self {
            rooms,
            connections: DashMap::new(),
            conn_rooms: DashMap::new(),
        }
    }

    /// Register a connection (called when a WebSocket connects).
    /// Returns the id and the receiver its writer task drains.
    pub fn register(&self) -> (ConnId, mpsc::Receiver<ServerMsg>) {
        let conn_id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

        self.connections.insert(
            conn_id,
            ClientConnection {
                conn_id,
                outbound_tx,
            },
        );

        debug!(conn_id = %conn_id, "Connection registered");
        (conn_id, outbound_rx)
    }

    /// Unregister a connection (called when a WebSocket disconnects).
    /// Frees its seat the same way an explicit leave does.
    pub fn unregister(&self, conn_id: ConnId) {
        if let Some((_, code)) = self.conn_rooms.remove(&conn_id) {
            self.vacate(conn_id, &code, "disconnected");
        }
        self.connections.remove(&conn_id);

        info!(conn_id = %conn_id, "Connection unregistered from relay");
    }

    /// Handle one decoded client message
    pub fn handle(&self, conn_id: ConnId, msg: ClientMsg) {
        match msg {
            ClientMsg::CreateRoom { game_code } => self.create_room(conn_id, &game_code),
            ClientMsg::JoinRoom { game_code } => self.join_room(conn_id, &game_code),
            ClientMsg::JoinGame { game_code } => self.join_game(conn_id, &game_code),
            ClientMsg::PlayerMove { game_code, x, y } => {
                self.player_move(conn_id, &game_code, x, y)
            }
            ClientMsg::LeaveGame { game_code } => self.leave_game(conn_id, &game_code),
        }
    }

    fn create_room(&self, conn_id: ConnId, raw_code: &str) {
        let Ok(code) = RoomCode::parse(raw_code) else {
            self.reject(conn_id, RoomError::InvalidCode);
            return;
        };

        if let Err(e) = self.rooms.create(code.clone(), conn_id) {
            self.reject(conn_id, e);
            return;
        }

        self.seat(conn_id, code.clone());
        info!(conn_id = %conn_id, code = %code, "Room created");
    }

    fn join_room(&self, conn_id: ConnId, raw_code: &str) {
        let Ok(code) = RoomCode::parse(raw_code) else {
            self.reject(conn_id, RoomError::InvalidCode);
            return;
        };

        let creator = match self.rooms.join(&code, conn_id) {
            Ok(creator) => creator,
            Err(e) => {
                self.reject(conn_id, e);
                return;
            }
        };

        self.seat(conn_id, code.clone());
        self.send(conn_id, ServerMsg::RoomJoined);
        if let Some(creator) = creator {
            self.send(creator, ServerMsg::Player2Connected);
        }

        info!(conn_id = %conn_id, code = %code, "Second participant joined room");
    }

    fn join_game(&self, conn_id: ConnId, raw_code: &str) {
        match self.seated_room(conn_id, raw_code) {
            Some(code) => {
                info!(conn_id = %conn_id, code = %code, "Participant entered match scene");
            }
            None => {
                warn!(conn_id = %conn_id, code = raw_code, "joinGame for a room the client is not in");
            }
        }
    }

    fn player_move(&self, conn_id: ConnId, raw_code: &str, x: f64, y: f64) {
        let Some(code) = self.seated_room(conn_id, raw_code) else {
            debug!(conn_id = %conn_id, code = raw_code, "Dropping move from unseated client");
            return;
        };

        if let Some(peer) = self.rooms.peer_of(&code, conn_id) {
            self.send(peer, ServerMsg::PlayerMoved { x, y });
        }
    }

    fn leave_game(&self, conn_id: ConnId, raw_code: &str) {
        let Some(code) = self.seated_room(conn_id, raw_code) else {
            debug!(conn_id = %conn_id, code = raw_code, "leaveGame for a room the client is not in");
            return;
        };

        self.conn_rooms.remove(&conn_id);
        self.vacate(conn_id, &code, "left");
    }

    /// Seat bookkeeping; a connection sits in at most one room
    fn seat(&self, conn_id: ConnId, code: RoomCode) {
        if let Some(previous) = self.conn_rooms.insert(conn_id, code.clone()) {
            if previous != code {
                self.vacate(conn_id, &previous, "moved to another room");
            }
        }
    }

    fn vacate(&self, conn_id: ConnId, code: &RoomCode, reason: &str) {
        match self.rooms.leave(code, conn_id) {
            LeaveOutcome::Left { seat, destroyed } => {
                info!(
                    conn_id = %conn_id,
                    code = %code,
                    ?seat,
                    destroyed,
                    reason,
                    "Participant left room"
                );
            }
            LeaveOutcome::NotSeated => {
                debug!(conn_id = %conn_id, code = %code, "Vacate for unseated connection");
            }
        }
    }

    /// The room the connection is seated in, if it matches `raw_code`
    fn seated_room(&self, conn_id: ConnId, raw_code: &str) -> Option<RoomCode> {
        let code = RoomCode::parse(raw_code).ok()?;
        let seated = self.conn_rooms.get(&conn_id)?;
        (*seated == code).then_some(code)
    }

    fn reject(&self, conn_id: ConnId, error: RoomError) {
        warn!(conn_id = %conn_id, error = %error, "Room request rejected");
        self.send(conn_id, ServerMsg::Error(error.to_string()));
    }

    /// Queue a message for a connection without waiting
    fn send(&self, conn_id: ConnId, msg: ServerMsg) {
        let Some(conn) = self.connections.get(&conn_id) else {
            debug!(conn_id = %conn_id, "Send to unknown connection");
            return;
        };

        if let Err(e) = conn.outbound_tx.try_send(msg) {
            warn!(conn_id = %conn_id, error = %e, "Dropping outbound message");
        }
    }

    /// Get a room summary by code
    pub fn room(&self, code: &RoomCode) -> Option<RoomSummary> {
        self.rooms.get(code)
    }

    /// Get the room a connection is seated in
    pub fn room_of(&self, conn_id: &ConnId) -> Option<RoomCode> {
        self.conn_rooms.get(conn_id).map(|r| r.value().clone())
    }

    pub fn connected_clients(&self) -> usize {
        self.connections.len()
    }
}
