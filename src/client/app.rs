//! Client application: owns the current scene and is the single dispatch
//! point for relay events.

use std::time::Instant;

use tracing::info;

use crate::ws::protocol::ServerMsg;

use super::lobby::Lobby;
use super::scene::{Keys, MatchScene, SceneExit};
use super::transport::Emitter;

/// The active scene
#[derive(Debug)]
pub enum Scene {
    Menu(Lobby),
    Match(MatchScene),
}

/// Top-level client state
#[derive(Debug)]
pub struct ClientApp {
    scene: Scene,
}

impl ClientApp {
    pub fn new() -> Self {
        Self {
            scene: Scene::Menu(Lobby::new()),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn lobby_mut(&mut self) -> Option<&mut Lobby> {
        match &mut self.scene {
            Scene::Menu(lobby) => Some(lobby),
            Scene::Match(_) => None,
        }
    }

    pub fn match_scene(&self) -> Option<&MatchScene> {
        match &self.scene {
            Scene::Match(scene) => Some(scene),
            Scene::Menu(_) => None,
        }
    }

    pub fn match_scene_mut(&mut self) -> Option<&mut MatchScene> {
        match &mut self.scene {
            Scene::Match(scene) => Some(scene),
            Scene::Menu(_) => None,
        }
    }

    /// Route one relay event to whichever scene is active
    pub fn dispatch<E: Emitter + ?Sized>(&mut self, msg: ServerMsg, now: Instant, emitter: &E) {
        match &mut self.scene {
            Scene::Menu(lobby) => lobby.handle_event(msg, now),
            Scene::Match(scene) => scene.handle_event(msg),
        }
        self.maybe_start_match(now, emitter);
    }

    /// One rendered frame. In the menu a `createRoom` that could not be
    /// queued is retried and a pending match is started; in a match the
    /// update runs followed by the physics step.
    pub fn tick<E: Emitter + ?Sized>(&mut self, now: Instant, keys: &Keys, emitter: &E) {
        if let Scene::Menu(lobby) = &mut self.scene {
            if emitter.is_connected() {
                lobby.retry_create(emitter);
            }
        }
        self.maybe_start_match(now, emitter);

        if let Scene::Match(scene) = &mut self.scene {
            scene.frame(keys, emitter);
            scene.step_physics();
        }
    }

    /// Pause overlay "Leave": tear the match down back to the menu
    pub fn leave_match<E: Emitter + ?Sized>(&mut self, emitter: &E) -> bool {
        let Scene::Match(scene) = &mut self.scene else {
            return false;
        };
        if scene.leave(emitter) != Some(SceneExit::Left) {
            return false;
        }
        self.scene = Scene::Menu(Lobby::new());
        true
    }

    fn maybe_start_match<E: Emitter + ?Sized>(&mut self, now: Instant, emitter: &E) {
        let Scene::Menu(lobby) = &mut self.scene else {
            return;
        };
        let Some(start) = lobby.poll(now) else {
            return;
        };

        info!(code = %start.code, seat = ?start.seat, "Starting match");
        let scene = MatchScene::new(start);
        scene.enter(emitter);
        self.scene = Scene::Match(scene);
    }
}

impl Default for ClientApp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::scene::MOVE_SPEED;
    use crate::client::transport::testing::RecordingEmitter;
    use crate::matchmaking::Seat;
    use crate::ws::protocol::{ClientMsg, Position};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    #[test]
    fn creator_flow_enters_match_after_delay_and_announces() {
        let emitter = RecordingEmitter::connected();
        let mut app = ClientApp::new();
        let lobby = app.lobby_mut().unwrap();
        lobby.open_play_options();
        let code = lobby.create_room(&mut StdRng::seed_from_u64(9), &emitter);
        emitter.take();

        let t0 = Instant::now();
        app.dispatch(ServerMsg::Player2Connected, t0, &emitter);
        app.tick(t0 + Duration::from_millis(500), &Keys::default(), &emitter);
        assert!(app.match_scene().is_none());
        assert!(emitter.take().is_empty());

        app.tick(t0 + Duration::from_millis(1000), &Keys::default(), &emitter);
        let scene = app.match_scene().unwrap();
        assert_eq!(scene.seat(), Seat::Player1);

        let sent = emitter.take();
        assert_eq!(
            sent[0],
            ClientMsg::JoinGame {
                game_code: code.to_string()
            }
        );
        assert!(matches!(sent[1], ClientMsg::PlayerMove { .. }));
    }

    #[test]
    fn joiner_flow_starts_on_room_joined() {
        let emitter = RecordingEmitter::connected();
        let mut app = ClientApp::new();
        let lobby = app.lobby_mut().unwrap();
        lobby.begin_join();
        lobby.submit_join_code("ab12c", &emitter);
        emitter.take();

        app.dispatch(ServerMsg::RoomJoined, Instant::now(), &emitter);

        assert_eq!(app.match_scene().unwrap().seat(), Seat::Player2);
        assert_eq!(
            emitter.take(),
            vec![ClientMsg::JoinGame {
                game_code: "AB12C".to_string()
            }]
        );
    }

    #[test]
    fn match_frames_move_and_sync() {
        let emitter = RecordingEmitter::connected();
        let mut app = ClientApp::new();
        let lobby = app.lobby_mut().unwrap();
        lobby.begin_join();
        lobby.submit_join_code("ABCDE", &emitter);
        let now = Instant::now();
        app.dispatch(ServerMsg::RoomJoined, now, &emitter);
        emitter.take();

        app.tick(now, &Keys { right: true, ..Keys::default() }, &emitter);
        let scene = app.match_scene().unwrap();
        assert_eq!(scene.local().position.x, 670.0 + MOVE_SPEED);

        app.dispatch(ServerMsg::PlayerMoved { x: 200.0, y: 300.0 }, now, &emitter);
        assert_eq!(
            app.match_scene().unwrap().remote().position,
            Position::new(200.0, 300.0)
        );

        emitter.connected.set(false);
        emitter.take();
        app.tick(now, &Keys::default(), &emitter);
        assert!(emitter.take().is_empty());
    }

    #[test]
    fn menu_tick_retries_create_once_connected() {
        let emitter = RecordingEmitter::connected();
        emitter.connected.set(false);
        let mut app = ClientApp::new();
        let code = app
            .lobby_mut()
            .unwrap()
            .create_room(&mut StdRng::seed_from_u64(4), &emitter);

        let now = Instant::now();
        app.tick(now, &Keys::default(), &emitter);
        assert!(emitter.take().is_empty());

        emitter.connected.set(true);
        app.tick(now, &Keys::default(), &emitter);
        assert_eq!(
            emitter.take(),
            vec![ClientMsg::CreateRoom {
                game_code: code.to_string()
            }]
        );

        app.tick(now, &Keys::default(), &emitter);
        assert!(emitter.take().is_empty());
    }

    #[test]
    fn leaving_returns_to_a_fresh_menu() {
        let emitter = RecordingEmitter::connected();
        let mut app = ClientApp::new();
        let lobby = app.lobby_mut().unwrap();
        lobby.begin_join();
        lobby.submit_join_code("ABCDE", &emitter);
        app.dispatch(ServerMsg::RoomJoined, Instant::now(), &emitter);
        emitter.take();

        assert!(!app.leave_match(&emitter));

        app.match_scene_mut().unwrap().open_pause();
        assert!(app.leave_match(&emitter));
        assert!(app.match_scene().is_none());
        assert_eq!(
            emitter.take(),
            vec![ClientMsg::LeaveGame {
                game_code: "ABCDE".to_string()
            }]
        );
    }
}
