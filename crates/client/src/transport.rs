//! Socket plumbing behind the connection manager.
//!
//! A [`Connector`] opens a [`Connection`], which is just a pair of bounded
//! channels carrying text frames. Pump tasks own the actual socket.

use crate::errors::ClientError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

pub const FRAME_CHANNEL_CAPACITY: usize = 16;

/// An open socket seen as two channels.
///
/// `inbound` closing means the socket closed. Dropping `outbound` closes the
/// socket gracefully.
#[derive(Debug)]
pub struct Connection {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<String>,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Connection, ClientError>;
}

/// WebSocket transport over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, ClientError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        info!(url = %url, "WebSocket connected");

        let (mut sink, mut stream) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(FRAME_CHANNEL_CAPACITY);
        let (inbound_tx, inbound) = mpsc::channel::<String>(FRAME_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!(error = %e, "WebSocket write failed");
                    return;
                }
            }
            if let Err(e) = sink.close().await {
                debug!(error = %e, "WebSocket close handshake failed");
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
                    Ok(Message::Close(close)) => {
                        debug!(frame = ?close, "WebSocket closed by peer");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "WebSocket read failed");
                        break;
                    }
                };
                if inbound_tx.send(text).await.is_err() {
                    break;
                }
            }
        });

        Ok(Connection { outbound, inbound })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Server side of a mock connection. Dropping it closes the socket.
    pub(crate) struct MockPeer {
        pub requests: mpsc::Receiver<String>,
        pub responses: mpsc::Sender<String>,
    }

    impl MockPeer {
        pub async fn reply(&self, text: impl Into<String>) {
            self.responses
                .send(text.into())
                .await
                .expect("client dropped the connection");
        }
    }

    struct Shared {
        fail_next: AtomicU32,
        attempts: AtomicU32,
        delay: parking_lot::Mutex<Duration>,
        peers_tx: mpsc::UnboundedSender<MockPeer>,
        peers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockPeer>>,
    }

    #[derive(Clone)]
    pub(crate) struct MockConnector {
        shared: Arc<Shared>,
    }

    impl MockConnector {
        pub fn new() -> Self {
            let (peers_tx, peers_rx) = mpsc::unbounded_channel();
            Self {
                shared: Arc::new(Shared {
                    fail_next: AtomicU32::new(0),
                    attempts: AtomicU32::new(0),
                    delay: parking_lot::Mutex::new(Duration::ZERO),
                    peers_tx,
                    peers_rx: tokio::sync::Mutex::new(peers_rx),
                }),
            }
        }

        /// Refuse the next `n` connection attempts.
        pub fn fail_next(&self, n: u32) {
            self.shared.fail_next.store(n, Ordering::SeqCst);
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.shared.delay.lock() = delay;
        }

        pub fn attempts(&self) -> u32 {
            self.shared.attempts.load(Ordering::SeqCst)
        }

        pub async fn next_peer(&self) -> MockPeer {
            self.shared
                .peers_rx
                .lock()
                .await
                .recv()
                .await
                .expect("connector dropped")
        }

        pub fn try_peer(&self) -> Option<MockPeer> {
            self.shared.peers_rx.try_lock().ok()?.try_recv().ok()
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, _url: &str) -> Result<Connection, ClientError> {
            self.shared.attempts.fetch_add(1, Ordering::SeqCst);

            let delay = *self.shared.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let refused = self
                .shared
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(ClientError::Connection("connection refused".to_string()));
            }

            let (outbound, requests) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
            let (responses, inbound) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
            let _ = self.shared.peers_tx.send(MockPeer {
                requests,
                responses,
            });

            Ok(Connection { outbound, inbound })
        }
    }
}
