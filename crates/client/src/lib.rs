//! Streaming connection manager for the detection service.
//!
//! [`ConnectionManager`] owns one WebSocket, reconnects with geometric
//! backoff after unexpected closes, and allows a single request in flight.
//! [`StreamController`] paces frame capture on top of any
//! [`DetectionBackend`].

pub mod backend;
pub mod backoff;
pub mod config;
pub mod errors;
pub mod manager;
mod metrics;
pub mod observer;
mod pending;
pub mod state;
pub mod stream;
pub mod transport;

pub use backend::DetectionBackend;
pub use backoff::ReconnectPolicy;
pub use config::ClientConfig;
pub use errors::{ClientError, ErrorCategory};
pub use manager::ConnectionManager;
pub use observer::{ConnectionObserver, DisconnectReason, NoopObserver};
pub use state::{ConnectionState, ConnectionStatus};
pub use stream::{FrameSource, StreamConfig, StreamController, StreamHandler, StreamStatus};
pub use transport::{Connection, Connector, WsConnector};
