//! Match scene: local movement, per-frame position broadcast and peer apply

use tracing::{debug, info};

use crate::matchmaking::Seat;
use crate::ws::protocol::{ClientMsg, Position, ServerMsg};

use super::lobby::MatchStart;
use super::transport::Emitter;

/// Horizontal/vertical speed set directly from held keys
pub const MOVE_SPEED: f64 = 5.0;
/// Vertical velocity set by a jump
pub const JUMP_VELOCITY: f64 = -15.0;

/// Shared arena layout (800x600 world)
pub mod arena {
    pub const WORLD_WIDTH: f64 = 800.0;
    pub const WORLD_HEIGHT: f64 = 600.0;
    pub const PLATFORM_WIDTH: f64 = WORLD_WIDTH * 0.8;
    pub const PLATFORM_HEIGHT: f64 = 200.0;
    pub const PLATFORM_X: f64 = WORLD_WIDTH / 2.0;
    pub const PLATFORM_Y: f64 = WORLD_HEIGHT - PLATFORM_HEIGHT / 2.0;
    /// Rest height of a player standing on the platform
    pub const GROUND_Y: f64 = PLATFORM_Y - PLATFORM_HEIGHT / 2.0 - 50.0;
    pub const PLAYER1_SPAWN_X: f64 = PLATFORM_X - PLATFORM_WIDTH / 2.0 + 50.0;
    pub const PLAYER2_SPAWN_X: f64 = PLATFORM_X + PLATFORM_WIDTH / 2.0 - 50.0;
    pub const GRAVITY: f64 = 0.5;
}

/// Keys held during a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
}

/// Velocity in units per frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

/// A player entity's kinematic state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Position,
    pub velocity: Velocity,
}

impl Body {
    pub fn at(position: Position) -> Self {
        Self {
            position,
            velocity: Velocity::default(),
        }
    }

    /// Spawn point for a seat
    pub fn spawn(seat: Seat) -> Self {
        let x = match seat {
            Seat::Player1 => arena::PLAYER1_SPAWN_X,
            Seat::Player2 => arena::PLAYER2_SPAWN_X,
        };
        Self::at(Position::new(x, arena::GROUND_Y))
    }

    /// One physics step: gravity, integrate, land on the platform
    pub fn step(&mut self) {
        self.velocity.y += arena::GRAVITY;
        self.position.x += self.velocity.x;
        self.position.y += self.velocity.y;

        let half_width = arena::PLATFORM_WIDTH / 2.0;
        let over_platform = (self.position.x - arena::PLATFORM_X).abs() <= half_width;
        if over_platform && self.position.y >= arena::GROUND_Y && self.velocity.y >= 0.0 {
            self.position.y = arena::GROUND_Y;
            self.velocity.y = 0.0;
        }
    }
}

/// Turn held keys into velocity. Movement is immediate, not accelerated.
/// Jump only fires when the vertical velocity reads exactly zero after the
/// up/down keys have been applied.
pub fn apply_movement(body: &mut Body, keys: &Keys) {
    body.velocity.x = if keys.left {
        -MOVE_SPEED
    } else if keys.right {
        MOVE_SPEED
    } else {
        0.0
    };

    body.velocity.y = if keys.up {
        -MOVE_SPEED
    } else if keys.down {
        MOVE_SPEED
    } else {
        0.0
    };

    if keys.jump && body.velocity.y == 0.0 {
        body.velocity.y = JUMP_VELOCITY;
    }
}

/// How the scene ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneExit {
    /// Player chose Leave in the pause overlay
    Left,
}

/// Two-player match
#[derive(Debug)]
pub struct MatchScene {
    code: String,
    seat: Seat,
    player1: Body,
    player2: Body,
    paused: bool,
}

impl MatchScene {
    pub fn new(start: MatchStart) -> Self {
        Self {
            code: start.code,
            seat: start.seat,
            player1: Body::spawn(Seat::Player1),
            player2: Body::spawn(Seat::Player2),
            paused: false,
        }
    }

    /// Announce presence once the scene is up
    pub fn enter<E: Emitter + ?Sized>(&self, emitter: &E) {
        info!(code = %self.code, seat = ?self.seat, "Match scene started");
        emitter.emit(ClientMsg::JoinGame {
            game_code: self.code.clone(),
        });
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn local(&self) -> &Body {
        match self.seat {
            Seat::Player1 => &self.player1,
            Seat::Player2 => &self.player2,
        }
    }

    pub fn remote(&self) -> &Body {
        match self.seat {
            Seat::Player1 => &self.player2,
            Seat::Player2 => &self.player1,
        }
    }

    fn local_mut(&mut self) -> &mut Body {
        match self.seat {
            Seat::Player1 => &mut self.player1,
            Seat::Player2 => &mut self.player2,
        }
    }

    fn remote_mut(&mut self) -> &mut Body {
        match self.seat {
            Seat::Player1 => &mut self.player2,
            Seat::Player2 => &mut self.player1,
        }
    }

    /// Per-frame update. Skipped entirely while disconnected; otherwise
    /// applies input and broadcasts the local position. Returns whether a
    /// move was emitted.
    pub fn frame<E: Emitter + ?Sized>(&mut self, keys: &Keys, emitter: &E) -> bool {
        if !emitter.is_connected() {
            return false;
        }

        let body = self.local_mut();
        apply_movement(body, keys);
        let position = body.position;

        emitter.emit(ClientMsg::PlayerMove {
            game_code: self.code.clone(),
            x: position.x,
            y: position.y,
        })
    }

    /// Engine physics step for the local entity. The remote entity is only
    /// ever placed by network updates.
    pub fn step_physics(&mut self) {
        self.local_mut().step();
    }

    /// Teleport the peer entity to the reported position
    pub fn apply_remote(&mut self, position: Position) {
        self.remote_mut().position = position;
    }

    pub fn handle_event(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::PlayerMoved { x, y } => self.apply_remote(Position::new(x, y)),
            other => {
                debug!(code = %self.code, event = other.event_name(), "Ignoring event in match");
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Show the pause overlay. The frame loop keeps running underneath.
    pub fn open_pause(&mut self) {
        self.paused = true;
    }

    /// "Back" in the pause overlay
    pub fn dismiss_pause(&mut self) {
        self.paused = false;
    }

    /// "Leave" in the pause overlay: notify the relay and end the scene
    pub fn leave<E: Emitter + ?Sized>(&mut self, emitter: &E) -> Option<SceneExit> {
        if !self.paused {
            return None;
        }
        emitter.emit(ClientMsg::LeaveGame {
            game_code: self.code.clone(),
        });
        info!(code = %self.code, "Left match");
        Some(SceneExit::Left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::testing::RecordingEmitter;

    fn scene(seat: Seat) -> MatchScene {
        MatchScene::new(MatchStart {
            code: "ABCDE".to_string(),
            seat,
        })
    }

    fn falling_body() -> Body {
        Body {
            position: Position::new(0.0, 0.0),
            velocity: Velocity { x: 0.0, y: 3.0 },
        }
    }

    #[test]
    fn horizontal_keys_are_exclusive() {
        let mut body = falling_body();
        apply_movement(&mut body, &Keys { left: true, right: true, ..Keys::default() });
        assert_eq!(body.velocity.x, -MOVE_SPEED);

        apply_movement(&mut body, &Keys { right: true, ..Keys::default() });
        assert_eq!(body.velocity.x, MOVE_SPEED);

        apply_movement(&mut body, &Keys::default());
        assert_eq!(body.velocity.x, 0.0);
    }

    #[test]
    fn vertical_keys_are_exclusive() {
        let mut body = falling_body();
        apply_movement(&mut body, &Keys { up: true, down: true, ..Keys::default() });
        assert_eq!(body.velocity.y, -MOVE_SPEED);

        apply_movement(&mut body, &Keys { down: true, ..Keys::default() });
        assert_eq!(body.velocity.y, MOVE_SPEED);
    }

    #[test]
    fn jump_from_zero_vertical_velocity_is_exactly_minus_fifteen() {
        let mut body = Body::at(Position::new(0.0, 0.0));
        apply_movement(&mut body, &Keys { jump: true, ..Keys::default() });
        assert_eq!(body.velocity.y, JUMP_VELOCITY);
        assert_eq!(body.velocity.y, -15.0);
    }

    #[test]
    fn jump_is_ignored_while_vertical_velocity_is_nonzero() {
        let mut body = Body::at(Position::new(0.0, 0.0));
        apply_movement(&mut body, &Keys { up: true, jump: true, ..Keys::default() });
        assert_eq!(body.velocity.y, -MOVE_SPEED);

        apply_movement(&mut body, &Keys { down: true, jump: true, ..Keys::default() });
        assert_eq!(body.velocity.y, MOVE_SPEED);
    }

    #[test]
    fn spawns_on_opposite_sides_of_the_platform() {
        let p1 = Body::spawn(Seat::Player1);
        let p2 = Body::spawn(Seat::Player2);
        assert_eq!(p1.position, Position::new(130.0, 350.0));
        assert_eq!(p2.position, Position::new(670.0, 350.0));
    }

    #[test]
    fn frame_emits_local_position_tagged_with_code() {
        let emitter = RecordingEmitter::connected();
        let mut scene = scene(Seat::Player2);

        assert!(scene.frame(&Keys { left: true, ..Keys::default() }, &emitter));
        assert_eq!(
            emitter.take(),
            vec![ClientMsg::PlayerMove {
                game_code: "ABCDE".to_string(),
                x: 670.0,
                y: 350.0
            }]
        );
        assert_eq!(scene.local().velocity.x, -MOVE_SPEED);
    }

    #[test]
    fn no_move_is_emitted_while_disconnected() {
        let emitter = RecordingEmitter::connected();
        emitter.connected.set(false);
        let mut scene = scene(Seat::Player1);

        assert!(!scene.frame(&Keys { right: true, ..Keys::default() }, &emitter));
        assert!(emitter.take().is_empty());
        assert_eq!(scene.local().velocity, Velocity::default());
    }

    #[test]
    fn peer_update_teleports_without_smoothing() {
        let mut scene = scene(Seat::Player1);
        scene.handle_event(ServerMsg::PlayerMoved { x: 12.25, y: -3.5 });
        assert_eq!(scene.remote().position, Position::new(12.25, -3.5));
        assert_eq!(scene.local().position, Position::new(130.0, 350.0));

        scene.handle_event(ServerMsg::PlayerMoved { x: 700.0, y: 10.0 });
        assert_eq!(scene.remote().position, Position::new(700.0, 10.0));
    }

    #[test]
    fn body_lands_on_platform_and_can_jump_again() {
        let mut body = Body::spawn(Seat::Player1);
        apply_movement(&mut body, &Keys { jump: true, ..Keys::default() });
        body.step();
        assert!(body.position.y < arena::GROUND_Y);

        for _ in 0..200 {
            body.step();
        }
        assert_eq!(body.position.y, arena::GROUND_Y);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn pause_leave_emits_leave_game() {
        let emitter = RecordingEmitter::connected();
        let mut scene = scene(Seat::Player1);

        assert_eq!(scene.leave(&emitter), None);

        scene.open_pause();
        scene.dismiss_pause();
        assert!(!scene.is_paused());
        assert!(emitter.take().is_empty());

        scene.open_pause();
        assert_eq!(scene.leave(&emitter), Some(SceneExit::Left));
        assert_eq!(
            emitter.take(),
            vec![ClientMsg::LeaveGame {
                game_code: "ABCDE".to_string()
            }]
        );
    }
}
