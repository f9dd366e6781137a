//! WebSocket protocol message definitions
//! These are the wire types shared by the relay and the client core.
//!
//! Every frame is a JSON text message shaped as `{"event": ..., "data": ...}`.
//! Events without a payload omit `data`.

use serde::{Deserialize, Serialize};

/// A world-space position, as reported by the engine for a player sprite
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Messages sent from client to relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Register a new room under a client-generated code
    CreateRoom {
        #[serde(rename = "gameCode")]
        game_code: String,
    },

    /// Attempt to take the second seat of an existing room
    JoinRoom {
        #[serde(rename = "gameCode")]
        game_code: String,
    },

    /// Presence announcement once the match scene has started
    JoinGame {
        #[serde(rename = "gameCode")]
        game_code: String,
    },

    /// Local player position for the current frame
    PlayerMove {
        #[serde(rename = "gameCode")]
        game_code: String,
        x: f64,
        y: f64,
    },

    /// Voluntary departure from the room
    LeaveGame {
        #[serde(rename = "gameCode")]
        game_code: String,
    },
}

impl ClientMsg {
    /// Wire name of the event
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::JoinGame { .. } => "joinGame",
            Self::PlayerMove { .. } => "playerMove",
            Self::LeaveGame { .. } => "leaveGame",
        }
    }

    /// Room code the message is addressed to
    pub fn game_code(&self) -> &str {
        match self {
            Self::CreateRoom { game_code }
            | Self::JoinRoom { game_code }
            | Self::JoinGame { game_code }
            | Self::PlayerMove { game_code, .. }
            | Self::LeaveGame { game_code } => game_code,
        }
    }
}

/// Messages sent from relay to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMsg {
    /// The second participant took the free seat of the creator's room
    #[serde(rename = "player2Connected")]
    Player2Connected,

    /// Join request accepted
    #[serde(rename = "roomJoined")]
    RoomJoined,

    /// Peer position broadcast
    #[serde(rename = "playerMoved")]
    PlayerMoved { x: f64, y: f64 },

    /// Create/join rejection with a human-readable message
    #[serde(rename = "error")]
    Error(String),
}

impl ServerMsg {
    /// Wire name of the event
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Player2Connected => "player2Connected",
            Self::RoomJoined => "roomJoined",
            Self::PlayerMoved { .. } => "playerMoved",
            Self::Error(_) => "error",
        }
    }
}
