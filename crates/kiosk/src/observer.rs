use client::{ClientError, ConnectionObserver, ConnectionStatus, DisconnectReason, ErrorCategory};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Forwards connection events to `tracing`. With `echo_status`, status
/// transitions are printed to stdout as well.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver {
    echo_status: bool,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_echo(mut self) -> Self {
        self.echo_status = true;
        self
    }
}

impl ConnectionObserver for LoggingObserver {
    fn on_connect(&self) {
        info!("Connected to detection service");
    }

    fn on_disconnect(&self, reason: DisconnectReason) {
        match reason {
            DisconnectReason::Requested => info!("Disconnected from detection service"),
            DisconnectReason::Unexpected => warn!("Detection service closed the connection"),
        }
    }

    fn on_error(&self, err: &ClientError, category: ErrorCategory) {
        error!(error = %err, category = %category, "Detection client error");
    }

    fn on_message(&self, message: &Value) {
        debug!(
            success = message.get("success").and_then(serde_json::Value::as_bool),
            "Frame received"
        );
    }

    fn on_reconnect(&self, attempt: u32) {
        info!(attempt, "Reconnecting to detection service");
    }

    fn on_status(&self, status: &ConnectionStatus) {
        debug!(state = %status.state, "Connection status changed");
        if self.echo_status {
            println!("{status}");
        }
    }
}
