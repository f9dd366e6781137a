//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::matchmaking::{RelayService, RoomRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
    pub relay: Arc<RelayService>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize room registry
        let rooms = Arc::new(RoomRegistry::new());

        // Initialize relay service (Arc for sharing across cloned AppState)
        let relay = Arc::new(RelayService::new(rooms.clone()));

        Self {
            config,
            rooms,
            relay,
        }
    }
}
