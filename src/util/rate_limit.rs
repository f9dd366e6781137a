//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::ws::protocol::ClientMsg;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Position updates allowed per connection per second. Clients send one move
/// per rendered frame, so this covers high refresh rate displays too.
pub const MOVE_RATE_LIMIT: u32 = 240;

/// Per-connection rate limiter state. Only position updates are metered;
/// room control events always go through.
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    move_limiter: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new() -> Self {
        Self::with_limit(MOVE_RATE_LIMIT)
    }

    pub fn with_limit(moves_per_second: u32) -> Self {
        Self {
            move_limiter: create_limiter(moves_per_second),
        }
    }

    /// Check if an inbound message is allowed (returns true if allowed)
    pub fn check_inbound(&self, msg: &ClientMsg) -> bool {
        match msg {
            ClientMsg::PlayerMove { .. } => self.move_limiter.check().is_ok(),
            _ => true,
        }
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
