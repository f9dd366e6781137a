//! Headless duel client - drives the client core against a live relay with
//! scripted input

use std::time::Instant;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use duel_relay::client::{ClientApp, Emitter, Keys, RelayConnection, Scene};
use duel_relay::config::ClientConfig;
use duel_relay::init_tracing;
use duel_relay::matchmaking::Seat;
use duel_relay::util::time::{frame_duration, CLIENT_FPS};
use duel_relay::ws::protocol::ServerMsg;

#[derive(Parser)]
#[command(name = "duel-client")]
#[command(about = "Headless client for the duel relay")]
struct Cli {
    /// Relay WebSocket URL (overrides RELAY_URL)
    #[arg(long)]
    relay_url: Option<String>,

    /// Stop after this many match frames (0 runs until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    frames: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a room and wait for a second player
    Create,
    /// Join an existing room by code
    Join {
        /// Five-character room code
        code: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.relay_url {
        config.relay_url = url;
    }

    init_tracing(&config.log_level);

    // One connection for the whole process
    let (conn, inbound_rx) = RelayConnection::connect(&config.relay_url).await?;

    let mut app = ClientApp::new();
    if let Some(lobby) = app.lobby_mut() {
        match &cli.command {
            Command::Create => {
                lobby.open_play_options();
                let code = lobby.create_room(&mut rand::thread_rng(), &conn);
                info!("Game Code: {}", code);
            }
            Command::Join { code } => {
                lobby.begin_join();
                lobby.submit_join_code(code, &conn);
            }
        }
    }

    let result = run(&mut app, &conn, inbound_rx, cli.frames).await;

    if let Some(scene) = app.match_scene_mut() {
        scene.open_pause();
        app.leave_match(&conn);
    }
    conn.close().await;

    result
}

/// Frame loop: drain relay events, then run one frame
async fn run(
    app: &mut ClientApp,
    conn: &RelayConnection,
    mut inbound_rx: mpsc::Receiver<ServerMsg>,
    max_frames: u64,
) -> anyhow::Result<()> {
    let mut ticker = interval(frame_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut match_frames: u64 = 0;
    let mut last_status: Option<String> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let now = Instant::now();
        while let Ok(msg) = inbound_rx.try_recv() {
            app.dispatch(msg, now, conn);
        }

        if !conn.is_connected() {
            warn!("Relay connection lost");
            return Ok(());
        }

        let keys = match app.match_scene() {
            Some(scene) => scripted_keys(match_frames, scene.seat()),
            None => Keys::default(),
        };
        app.tick(now, &keys, conn);

        match app.scene() {
            Scene::Menu(lobby) => {
                if let Some(notice) = lobby.notice(now) {
                    anyhow::bail!("Relay rejected the request: {}", notice);
                }
                let status = lobby.status_line();
                if status != last_status {
                    if let Some(line) = &status {
                        info!("{}", line);
                    }
                    last_status = status;
                }
            }
            Scene::Match(scene) => {
                match_frames += 1;
                if match_frames % CLIENT_FPS as u64 == 0 {
                    let local = scene.local().position;
                    let remote = scene.remote().position;
                    info!(
                        local_x = local.x,
                        local_y = local.y,
                        peer_x = remote.x,
                        peer_y = remote.y,
                        "Positions"
                    );
                }
                if max_frames > 0 && match_frames >= max_frames {
                    info!(frames = match_frames, "Frame limit reached");
                    return Ok(());
                }
            }
        }
    }
}

/// Walk toward the middle of the platform, walk back, hop, then idle,
/// 1.5 seconds each
fn scripted_keys(frame: u64, seat: Seat) -> Keys {
    let phase_len = (CLIENT_FPS as u64 * 3) / 2;
    let inward = Keys {
        right: seat == Seat::Player1,
        left: seat == Seat::Player2,
        ..Keys::default()
    };
    let outward = Keys {
        right: inward.left,
        left: inward.right,
        ..Keys::default()
    };

    match (frame / phase_len) % 4 {
        0 => inward,
        1 => outward,
        2 => Keys {
            jump: frame % phase_len == 0,
            ..Keys::default()
        },
        _ => Keys::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_relay::client::scene::apply_movement;
    use duel_relay::client::Body;

    #[test]
    fn scripted_walk_stays_on_the_platform() {
        for seat in [Seat::Player1, Seat::Player2] {
            let mut body = Body::spawn(seat);
            for frame in 0..(CLIENT_FPS as u64 * 12) {
                apply_movement(&mut body, &scripted_keys(frame, seat));
                body.step();
                assert!(
                    (70.0..=730.0).contains(&body.position.x),
                    "{:?} walked off at frame {}: {}",
                    seat,
                    frame,
                    body.position.x
                );
            }
        }
    }
}
