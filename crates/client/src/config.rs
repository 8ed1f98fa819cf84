use crate::backoff::{BACKOFF_FACTOR, ReconnectPolicy};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8765";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    /// Automatic reconnects after an unexpected close. 0 disables them.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect; later ones grow by 1.5x.
    pub reconnect_interval: Duration,
    pub max_reconnect_delay: Duration,
    pub response_timeout: Duration,
    pub connect_timeout: Duration,
    pub auto_connect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            max_reconnect_attempts: 3,
            reconnect_interval: Duration::from_millis(2000),
            max_reconnect_delay: Duration::from_secs(30),
            response_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            auto_connect: false,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `CLIENT_*` environment variables.
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_url: env::var("CLIENT_SERVER_URL").unwrap_or(defaults.server_url),
            max_reconnect_attempts: env_or(
                "CLIENT_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            reconnect_interval: env_millis_or(
                "CLIENT_RECONNECT_INTERVAL_MS",
                defaults.reconnect_interval,
            ),
            max_reconnect_delay: defaults.max_reconnect_delay,
            response_timeout: env_millis_or("CLIENT_RESPONSE_TIMEOUT_MS", defaults.response_timeout),
            connect_timeout: env_millis_or("CLIENT_CONNECT_TIMEOUT_MS", defaults.connect_timeout),
            auto_connect: env_or("CLIENT_AUTO_CONNECT", defaults.auto_connect),
        }
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.max_reconnect_attempts,
            base_delay: self.reconnect_interval,
            max_delay: self.max_reconnect_delay,
            factor: BACKOFF_FACTOR,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_millis_or(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
