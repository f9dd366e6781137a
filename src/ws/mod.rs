//! WebSocket transport: wire protocol and the relay's upgrade handler

pub mod handler;
pub mod protocol;

pub use protocol::{ClientMsg, Position, ServerMsg};
