//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::matchmaking::{ConnId, RelayService};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sink, ws_stream) = socket.split();

    // Register with the relay to get an id and outbound channel
    let (conn_id, outbound_rx) = state.relay.register();
    info!(conn_id = %conn_id, "New WebSocket connection");

    run_session(conn_id, &state.relay, ws_sink, ws_stream, outbound_rx).await;

    // Cleanup on disconnect
    state.relay.unregister(conn_id);

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: ConnId,
    relay: &RelayService,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: relay events -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        debug!(conn_id = %conn_id, "Outbound channel closed");
    });

    // Reader loop: WebSocket -> relay
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => handle_text(conn_id, relay, &rate_limiter, &text),
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(conn_id = %conn_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Decode one text frame and hand it to the relay. Malformed frames and
/// moves over the rate limit are dropped; the session keeps running.
fn handle_text(
    conn_id: ConnId,
    relay: &RelayService,
    rate_limiter: &ConnectionRateLimiter,
    text: &str,
) {
    let client_msg = match serde_json::from_str::<ClientMsg>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
            return;
        }
    };

    if !rate_limiter.check_inbound(&client_msg) {
        debug!(conn_id = %conn_id, "Rate limited position update");
        return;
    }

    debug!(conn_id = %conn_id, event = client_msg.event_name(), "Inbound event");
    relay.handle(conn_id, client_msg);
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::matchmaking::RoomRegistry;

    #[tokio::test]
    async fn leave_gets_through_after_move_quota_is_spent() {
        let relay = RelayService::new(Arc::new(RoomRegistry::new()));
        let limiter = ConnectionRateLimiter::with_limit(2);
        let (a, _a_rx) = relay.register();
        let (b, mut b_rx) = relay.register();

        let create = r#"{"event":"createRoom","data":{"gameCode":"ROOM1"}}"#;
        let join = r#"{"event":"joinRoom","data":{"gameCode":"ROOM1"}}"#;
        handle_text(a, &relay, &limiter, create);
        handle_text(b, &relay, &ConnectionRateLimiter::new(), join);
        assert_eq!(b_rx.recv().await, Some(ServerMsg::RoomJoined));

        let mv = r#"{"event":"playerMove","data":{"gameCode":"ROOM1","x":1.0,"y":2.0}}"#;
        for _ in 0..3 {
            handle_text(a, &relay, &limiter, mv);
        }
        assert!(b_rx.recv().await.is_some());
        assert!(b_rx.recv().await.is_some());
        assert!(b_rx.try_recv().is_err());

        let leave = r#"{"event":"leaveGame","data":{"gameCode":"ROOM1"}}"#;
        handle_text(a, &relay, &limiter, leave);
        assert!(relay.room_of(&a).is_none());
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let relay = RelayService::new(Arc::new(RoomRegistry::new()));
        let limiter = ConnectionRateLimiter::new();
        let (a, mut a_rx) = relay.register();

        handle_text(a, &relay, &limiter, "not json");
        handle_text(a, &relay, &limiter, r#"{"event":"teleport"}"#);
        assert!(a_rx.try_recv().is_err());

        let create = r#"{"event":"createRoom","data":{"gameCode":"ROOM1"}}"#;
        handle_text(a, &relay, &limiter, create);
        assert_eq!(relay.room_of(&a).unwrap().as_str(), "ROOM1");
    }
}
