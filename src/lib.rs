//! Duel relay - room pairing and position relay for two-player matches
//!
//! The crate has two halves:
//! - the relay server: WebSocket room registry and event forwarding
//! - the client core: relay transport, menu flow and per-frame position sync

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod matchmaking;
pub mod util;
pub mod ws;

pub use app::AppState;
pub use config::Config;
pub use http::build_router;

/// Build the relay router from configuration
pub fn create_app(config: Config) -> axum::Router {
    build_router(AppState::new(config))
}

/// Install the tracing subscriber used by both binaries
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
