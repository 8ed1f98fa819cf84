use crate::errors::{ClientError, ErrorCategory};
use crate::state::ConnectionStatus;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called.
    Requested,
    /// The service or the network closed the socket.
    Unexpected,
}

/// Receives connection events. Every method defaults to a no-op.
///
/// Callbacks run on the task that produced the event and never while the
/// manager holds its lock, so they may call back into the manager.
pub trait ConnectionObserver: Send + Sync {
    fn on_connect(&self) {}

    fn on_disconnect(&self, _reason: DisconnectReason) {}

    fn on_error(&self, _error: &ClientError, _category: ErrorCategory) {}

    /// Every well-formed JSON frame, solicited or not.
    fn on_message(&self, _message: &Value) {}

    fn on_reconnect(&self, _attempt: u32) {}

    fn on_status(&self, _status: &ConnectionStatus) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ConnectionObserver for NoopObserver {}
