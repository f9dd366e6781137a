//! Time utilities

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Client frame rate the headless client drives its loop at
pub const CLIENT_FPS: u32 = 60;

/// Duration of one client frame
pub fn frame_duration() -> Duration {
    Duration::from_micros(1_000_000 / CLIENT_FPS as u64)
}
