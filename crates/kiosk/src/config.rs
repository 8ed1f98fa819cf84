use client::{ClientConfig, StreamConfig};
use common::{Environment, LogLevel};
use schema::{DetectionConfig, RequestMode};
use serde::Deserialize;
use simulator::SimulatorConfig;
use std::path::Path;
use std::time::Duration;

/// Base name of the optional settings file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "kiosk";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log_level: LogLevel,
    pub environment: Environment,
    /// OTLP collector. Plain logging only when unset.
    #[serde(default)]
    pub otel_endpoint: Option<String>,
    /// Use the simulator when the detection service cannot be reached.
    pub fallback_to_simulator: bool,
    pub server: ServerSettings,
    pub detection: DetectionSettings,
    pub stream: StreamSettings,
    pub simulator: SimulatorSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_interval_ms: u64,
    pub response_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionSettings {
    pub confidence: f32,
    pub enable_portion_calculation: bool,
    #[serde(default)]
    pub classes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorSettings {
    pub delay_ms: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Settings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            max_reconnect_attempts: self.server.max_reconnect_attempts,
            reconnect_interval: Duration::from_millis(self.server.reconnect_interval_ms),
            response_timeout: Duration::from_millis(self.server.response_timeout_ms),
            connect_timeout: Duration::from_millis(self.server.connect_timeout_ms),
            ..ClientConfig::default()
        }
        .with_server_url(self.server.url.clone())
    }

    pub fn detection_config(&self) -> DetectionConfig {
        let config = DetectionConfig::default()
            .with_confidence(self.detection.confidence)
            .with_portion_calculation(self.detection.enable_portion_calculation);

        match &self.detection.classes {
            Some(classes) if !classes.is_empty() => config.with_classes(classes.iter().cloned()),
            _ => config,
        }
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            interval: Duration::from_millis(self.stream.interval_ms),
            mode: RequestMode::Webcam,
            detection: self.detection_config(),
        }
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            delay: Duration::from_millis(self.simulator.delay_ms),
            seed: self.simulator.seed,
        }
    }
}

/// Load settings from built-in defaults, then the settings file, then
/// `KIOSK_*` environment variables (`KIOSK_SERVER__URL` sets `server.url`).
///
/// Without `file`, `kiosk.toml` in the working directory is read if present.
/// An explicit `file` must exist.
pub fn get_configuration(file: Option<&Path>) -> Result<Settings, config::ConfigError> {
    let file_source = match file {
        Some(path) => config::File::from(path.to_path_buf()),
        None => config::File::with_name(CONFIG_FILE_NAME).required(false),
    };

    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("fallback_to_simulator", true)?
        .set_default("server.url", client::config::DEFAULT_SERVER_URL)?
        .set_default("server.max_reconnect_attempts", 3)?
        .set_default("server.reconnect_interval_ms", 2000)?
        .set_default("server.response_timeout_ms", 15_000)?
        .set_default("server.connect_timeout_ms", 10_000)?
        .set_default("detection.confidence", 0.5)?
        .set_default("detection.enable_portion_calculation", true)?
        .set_default("stream.interval_ms", 200)?
        .set_default("simulator.delay_ms", 800)?
        .add_source(file_source)
        .add_source(
            config::Environment::with_prefix("KIOSK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = config.try_deserialize::<Settings>()?;
    if settings.stream.interval_ms == 0 {
        return Err(config::ConfigError::Message(
            "stream.interval_ms must be at least 1".to_string(),
        ));
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;

    #[test]
    #[serial]
    fn test_defaults() {
        let settings = get_configuration(None).unwrap();

        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(settings.environment, Environment::Development);
        assert!(settings.fallback_to_simulator);
        assert!(settings.otel_endpoint.is_none());

        let client = settings.client_config();
        assert_eq!(client.server_url, "ws://localhost:8765");
        assert_eq!(client.max_reconnect_attempts, 3);
        assert_eq!(client.reconnect_interval, Duration::from_secs(2));
        assert_eq!(client.response_timeout, Duration::from_secs(15));

        let stream = settings.stream_config();
        assert_eq!(stream.interval, Duration::from_millis(200));
        assert_eq!(stream.mode, RequestMode::Webcam);
        assert_eq!(stream.detection.confidence, 0.5);
        assert_eq!(stream.detection.enable_portion_calculation, Some(true));
        assert_eq!(stream.detection.classes, None);

        assert_eq!(settings.simulator_config().delay, Duration::from_millis(800));
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.toml");
        fs::write(
            &path,
            r#"
environment = "production"
otel_endpoint = "http://collector:4317"

[server]
url = "ws://cafeteria:9000"
max_reconnect_attempts = 0

[detection]
confidence = 0.7
classes = ["pilav", "tavuk"]

[simulator]
seed = 42
"#,
        )
        .unwrap();

        let settings = get_configuration(Some(&path)).unwrap();

        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.otel_endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(settings.client_config().server_url, "ws://cafeteria:9000");
        assert_eq!(settings.client_config().max_reconnect_attempts, 0);
        // Untouched keys keep their defaults
        assert_eq!(settings.server.connect_timeout_ms, 10_000);

        let detection = settings.detection_config();
        assert_eq!(detection.confidence, 0.7);
        assert_eq!(
            detection.classes,
            Some(vec!["pilav".to_string(), "tavuk".to_string()])
        );
        assert_eq!(settings.simulator_config().seed, Some(42));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.toml");
        fs::write(&path, "[server]\nurl = \"ws://from-file:1\"\n").unwrap();

        unsafe {
            env::set_var("KIOSK_SERVER__URL", "ws://from-env:2");
            env::set_var("KIOSK_FALLBACK_TO_SIMULATOR", "false");
            env::set_var("KIOSK_STREAM__INTERVAL_MS", "500");
            env::set_var("KIOSK_LOG_LEVEL", "debug");
        }

        let settings = get_configuration(Some(&path));

        unsafe {
            env::remove_var("KIOSK_SERVER__URL");
            env::remove_var("KIOSK_FALLBACK_TO_SIMULATOR");
            env::remove_var("KIOSK_STREAM__INTERVAL_MS");
            env::remove_var("KIOSK_LOG_LEVEL");
        }

        let settings = settings.unwrap();
        assert_eq!(settings.server.url, "ws://from-env:2");
        assert!(!settings.fallback_to_simulator);
        assert_eq!(settings.stream.interval_ms, 500);
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    #[serial]
    fn test_rejects_unknown_environment() {
        unsafe { env::set_var("KIOSK_ENVIRONMENT", "staging") };
        let result = get_configuration(None);
        unsafe { env::remove_var("KIOSK_ENVIRONMENT") };

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_rejects_zero_stream_interval() {
        unsafe { env::set_var("KIOSK_STREAM__INTERVAL_MS", "0") };
        let result = get_configuration(None);
        unsafe { env::remove_var("KIOSK_STREAM__INTERVAL_MS") };

        let err = result.unwrap_err();
        assert!(err.to_string().contains("stream.interval_ms"), "{err}");
    }

    #[test]
    #[serial]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let result = get_configuration(Some(&dir.path().join("missing.toml")));
        assert!(result.is_err());
    }
}
