//! Relay connection: one socket per client process

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Queue depth for both directions
const CHANNEL_BUFFER: usize = 256;

/// Fire-and-forget event emission plus the connected flag
pub trait Emitter {
    /// Queue an event for the relay. Returns false when it was not queued.
    fn emit(&self, msg: ClientMsg) -> bool;

    fn is_connected(&self) -> bool;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to relay: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Live connection to the relay
pub struct RelayConnection {
    outbound_tx: mpsc::Sender<ClientMsg>,
    connected: Arc<AtomicBool>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl RelayConnection {
    /// Connect and spawn the reader/writer tasks. Inbound events arrive on the
    /// returned receiver in socket order.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<ServerMsg>), TransportError> {
        let (ws_stream, _) = connect_async(url).await?;
        let (mut ws_sink, mut ws_source) = ws_stream.split();
        info!(url, "Connected to relay");

        let connected = Arc::new(AtomicBool::new(true));
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientMsg>(CHANNEL_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel::<ServerMsg>(CHANNEL_BUFFER);

        // Writer task: queued events -> socket; sends Close once the handle is dropped
        let writer_connected = connected.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode client message");
                        continue;
                    }
                };
                if let Err(e) = ws_sink.send(Message::Text(json)).await {
                    debug!(error = %e, "Relay send failed");
                    writer_connected.store(false, Ordering::Release);
                    return;
                }
            }
            let _ = ws_sink.send(Message::Close(None)).await;
        });

        // Reader task: socket -> inbound queue
        let reader_connected = connected.clone();
        let reader = tokio::spawn(async move {
            while let Some(result) = ws_source.next().await {
                match result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMsg>(&text) {
                        Ok(msg) => {
                            if inbound_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to parse relay message");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("Relay closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Relay connection error");
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::Release);
            info!("Disconnected from relay");
        });

        Ok((
            Self {
                outbound_tx,
                connected,
                writer,
                reader,
            },
            inbound_rx,
        ))
    }

    /// Flush queued events, send Close and stop the tasks
    pub async fn close(self) {
        let Self {
            outbound_tx,
            connected,
            writer,
            reader,
        } = self;

        drop(outbound_tx);
        if tokio::time::timeout(Duration::from_secs(1), writer).await.is_err() {
            debug!("Writer did not finish before timeout");
        }
        reader.abort();
        connected.store(false, Ordering::Release);
    }
}

impl Emitter for RelayConnection {
    fn emit(&self, msg: ClientMsg) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.outbound_tx.try_send(msg) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Dropping outbound event");
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};

    use super::Emitter;
    use crate::ws::protocol::ClientMsg;

    /// Emitter that records every event it is handed
    pub struct RecordingEmitter {
        pub sent: RefCell<Vec<ClientMsg>>,
        pub connected: Cell<bool>,
    }

    impl RecordingEmitter {
        pub fn connected() -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                connected: Cell::new(true),
            }
        }

        pub fn take(&self) -> Vec<ClientMsg> {
            self.sent.take()
        }
    }

    impl Emitter for RecordingEmitter {
        fn emit(&self, msg: ClientMsg) -> bool {
            if !self.connected.get() {
                return false;
            }
            self.sent.borrow_mut().push(msg);
            true
        }

        fn is_connected(&self) -> bool {
            self.connected.get()
        }
    }
}
