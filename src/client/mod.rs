//! Client core: transport, menu flow and match sync, independent of any renderer

pub mod app;
pub mod lobby;
pub mod scene;
pub mod transport;

pub use app::{ClientApp, Scene};
pub use lobby::{Lobby, LobbyState, MatchStart};
pub use scene::{Body, Keys, MatchScene};
pub use transport::{Emitter, RelayConnection, TransportError};
