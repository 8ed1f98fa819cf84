use schema::SchemaError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not connected to the detection service")]
    NotConnected,

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Another request is already in flight")]
    Busy,

    #[error("A connection attempt is already in progress")]
    ConnectInProgress,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] SchemaError),
}

/// Where an error reported to the observer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ConnectionEstablishment,
    MessageParsing,
    SendFailure,
    ResponseTimeout,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ConnectionEstablishment => "connection",
            ErrorCategory::MessageParsing => "message_parsing",
            ErrorCategory::SendFailure => "send",
            ErrorCategory::ResponseTimeout => "response_timeout",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
