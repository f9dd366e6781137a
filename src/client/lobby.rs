//! Room lifecycle on the client: create or join a room, then hand off to the match

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::matchmaking::{RoomCode, Seat};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::transport::Emitter;

/// Delay between the creator seeing its peer and entering the match
pub const PEER_CONNECTED_DELAY: Duration = Duration::from_secs(1);

/// How long a rejection notice stays on screen
pub const NOTICE_DURATION: Duration = Duration::from_secs(4);

/// Menu states
#[derive(Debug, Clone, PartialEq)]
pub enum LobbyState {
    /// Title menu
    Idle,
    /// Create / Join / Back
    PlayOptions,
    /// Code generated; `createRoom` not yet queued
    Creating { code: RoomCode },
    /// `createRoom` sent, showing the code
    WaitingForPeer { code: RoomCode },
    /// Code entry
    JoiningInput,
    /// `joinRoom` sent
    WaitingForJoinAck { code: String },
    /// Paired; the match starts at `start_at`
    Matched {
        code: String,
        seat: Seat,
        start_at: Instant,
    },
}

/// Everything the match scene needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchStart {
    pub code: String,
    pub seat: Seat,
}

/// A timed on-screen message
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

/// Menu flow state machine
#[derive(Debug)]
pub struct Lobby {
    state: LobbyState,
    notice: Option<Notice>,
}

impl Lobby {
    pub fn new() -> Self {
        Self {
            state: LobbyState::Idle,
            notice: None,
        }
    }

    pub fn state(&self) -> &LobbyState {
        &self.state
    }

    pub fn open_play_options(&mut self) {
        if self.state == LobbyState::Idle {
            self.state = LobbyState::PlayOptions;
        }
    }

    /// Generate a code and ask the relay to register it
    pub fn create_room<R, E>(&mut self, rng: &mut R, emitter: &E) -> RoomCode
    where
        R: Rng + ?Sized,
        E: Emitter + ?Sized,
    {
        let code = RoomCode::generate(rng);
        self.state = LobbyState::Creating { code: code.clone() };
        self.send_create(emitter);
        code
    }

    /// Re-send `createRoom` for a code that could not be queued
    pub fn retry_create<E: Emitter + ?Sized>(&mut self, emitter: &E) {
        self.send_create(emitter);
    }

    fn send_create<E: Emitter + ?Sized>(&mut self, emitter: &E) {
        let LobbyState::Creating { code } = &self.state else {
            return;
        };
        let code = code.clone();

        if emitter.emit(ClientMsg::CreateRoom {
            game_code: code.to_string(),
        }) {
            info!(code = %code, "Room requested, waiting for player 2");
            self.state = LobbyState::WaitingForPeer { code };
        } else {
            warn!(code = %code, "Could not send createRoom");
        }
    }

    pub fn begin_join(&mut self) {
        if matches!(self.state, LobbyState::Idle | LobbyState::PlayOptions) {
            self.state = LobbyState::JoiningInput;
        }
    }

    /// Submit the typed code. The code is trimmed and upper-cased; validity is
    /// the relay's call.
    pub fn submit_join_code<E: Emitter + ?Sized>(&mut self, input: &str, emitter: &E) -> bool {
        if self.state != LobbyState::JoiningInput {
            return false;
        }

        let code = input.trim().to_ascii_uppercase();
        if !emitter.emit(ClientMsg::JoinRoom {
            game_code: code.clone(),
        }) {
            warn!(code = %code, "Could not send joinRoom");
            return false;
        }

        debug!(code = %code, "Join requested");
        self.state = LobbyState::WaitingForJoinAck { code };
        true
    }

    /// Back button
    pub fn back<E: Emitter + ?Sized>(&mut self, emitter: &E) {
        self.state = match std::mem::replace(&mut self.state, LobbyState::Idle) {
            LobbyState::Idle | LobbyState::PlayOptions => LobbyState::Idle,
            LobbyState::WaitingForPeer { code } => {
                emitter.emit(ClientMsg::LeaveGame {
                    game_code: code.to_string(),
                });
                LobbyState::PlayOptions
            }
            // The join may already have been accepted; release the seat
            LobbyState::WaitingForJoinAck { code } => {
                emitter.emit(ClientMsg::LeaveGame { game_code: code });
                LobbyState::PlayOptions
            }
            LobbyState::Creating { .. } | LobbyState::JoiningInput => LobbyState::PlayOptions,
            matched @ LobbyState::Matched { .. } => matched,
        };
    }

    /// Apply one relay event
    pub fn handle_event(&mut self, msg: ServerMsg, now: Instant) {
        let state = std::mem::replace(&mut self.state, LobbyState::Idle);

        self.state = match (state, msg) {
            (LobbyState::WaitingForPeer { code }, ServerMsg::Player2Connected) => {
                info!(code = %code, "Player 2 connected");
                LobbyState::Matched {
                    code: code.to_string(),
                    seat: Seat::Player1,
                    start_at: now + PEER_CONNECTED_DELAY,
                }
            }
            (LobbyState::WaitingForJoinAck { code }, ServerMsg::RoomJoined) => {
                info!(code = %code, "Room joined");
                LobbyState::Matched {
                    code,
                    seat: Seat::Player2,
                    start_at: now,
                }
            }
            (LobbyState::WaitingForJoinAck { code }, ServerMsg::Error(message)) => {
                warn!(code = %code, error = %message, "Join rejected");
                self.show_notice(message, now);
                LobbyState::JoiningInput
            }
            (
                LobbyState::Creating { .. } | LobbyState::WaitingForPeer { .. },
                ServerMsg::Error(message),
            ) => {
                warn!(error = %message, "Room creation rejected");
                self.show_notice(message, now);
                LobbyState::PlayOptions
            }
            (state, msg) => {
                debug!(?state, event = msg.event_name(), "Ignoring event in menu");
                state
            }
        };
    }

    fn show_notice(&mut self, message: String, now: Instant) {
        self.notice = Some(Notice {
            message,
            expires_at: now + NOTICE_DURATION,
        });
    }

    /// Returns the match parameters once the start delay has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<MatchStart> {
        match &self.state {
            LobbyState::Matched {
                code,
                seat,
                start_at,
            } if now >= *start_at => Some(MatchStart {
                code: code.clone(),
                seat: *seat,
            }),
            _ => None,
        }
    }

    /// The current notice, if it has not expired
    pub fn notice(&self, now: Instant) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| now < n.expires_at)
            .map(|n| n.message.as_str())
    }

    /// Status text the menu shows for the current state
    pub fn status_line(&self) -> Option<String> {
        match &self.state {
            LobbyState::WaitingForPeer { code } => {
                Some(format!("Game Code: {} - Waiting for Player 2...", code))
            }
            LobbyState::Matched {
                seat: Seat::Player1,
                ..
            } => Some("Player 2 Connected!".to_string()),
            LobbyState::WaitingForJoinAck { code } => Some(format!("Joining {}...", code)),
            _ => None,
        }
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}
