//! Room pairing: codes, the room registry and the relay service

pub mod code;
pub mod rooms;
pub mod service;

pub use code::{CodeError, RoomCode, ROOM_CODE_LEN};
pub use rooms::{ConnId, LeaveOutcome, RoomError, RoomRegistry, RoomSummary, Seat};
pub use service::RelayService;
