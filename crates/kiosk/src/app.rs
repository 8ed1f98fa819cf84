use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::frames::DirectoryFrames;
use crate::observer::LoggingObserver;
use crate::report::{Report, Summary};
use anyhow::Context;
use client::{ClientError, ConnectionManager, DetectionBackend, StreamController, StreamHandler};
use schema::{DetectionResponse, ImageData, RequestMode};
use simulator::Simulator;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The detector picked for this run. Holds the live connection, if any, so
/// it can be closed on the way out.
pub struct Backend {
    detector: Arc<dyn DetectionBackend>,
    manager: Option<ConnectionManager>,
}

impl Backend {
    fn simulated(settings: &Settings) -> Self {
        Self {
            detector: Arc::new(Simulator::new(settings.simulator_config())),
            manager: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn detector(&self) -> Arc<dyn DetectionBackend> {
        Arc::clone(&self.detector)
    }

    pub fn shutdown(&self) {
        if let Some(manager) = &self.manager {
            manager.disconnect();
        }
    }
}

/// Connect to the detection service, falling back to the simulator when
/// that fails and `fallback_to_simulator` is set.
pub async fn select_backend(
    settings: &Settings,
    simulate: bool,
    observer: LoggingObserver,
) -> anyhow::Result<Backend> {
    if simulate {
        info!("Using simulator");
        return Ok(Backend::simulated(settings));
    }

    let manager = ConnectionManager::init(settings.client_config(), Arc::new(observer));
    match manager.connect().await {
        Ok(()) => Ok(Backend {
            detector: Arc::new(manager.clone()),
            manager: Some(manager),
        }),
        Err(e) if settings.fallback_to_simulator => {
            warn!(
                error = %e,
                url = %settings.server.url,
                "Detection service unreachable, falling back to simulator"
            );
            Ok(Backend::simulated(settings))
        }
        Err(e) => {
            Err(e).with_context(|| format!("failed to connect to {}", settings.server.url))
        }
    }
}

pub async fn run(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    match &cli.command {
        Command::Detect { image, json, .. } => detect(settings, cli.simulate, image, *json).await,
        Command::Stream {
            dir, duration_secs, ..
        } => {
            let duration = duration_secs.map(Duration::from_secs);
            stream(settings, cli.simulate, dir, duration).await
        }
        Command::Status => status(settings, cli.simulate).await,
    }
}

async fn detect(settings: &Settings, simulate: bool, image: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("failed to read image {}", image.display()))?;

    let backend = select_backend(settings, simulate, LoggingObserver::new()).await?;
    info!(backend = backend.name(), image = %image.display(), "Submitting image");

    let result = backend
        .detector()
        .detect(
            ImageData::Raw(bytes),
            RequestMode::Image,
            &settings.detection_config(),
        )
        .await;
    backend.shutdown();

    let response = result
        .context("detection request failed")?
        .filtered(settings.detection.confidence)
        .sorted_by_confidence();

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", Report(&response));
    }
    Ok(())
}

/// Prints one summary line per streamed frame.
struct ConsoleHandler {
    min_confidence: f32,
}

impl StreamHandler for ConsoleHandler {
    fn on_result(&self, response: DetectionResponse) {
        let response = response.filtered(self.min_confidence).sorted_by_confidence();
        println!("{}", Summary(&response));
    }

    fn on_error(&self, error: ClientError) {
        warn!(error = %error, "Frame failed");
    }
}

async fn stream(
    settings: &Settings,
    simulate: bool,
    dir: &Path,
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    let frames = DirectoryFrames::open(dir)?;
    let backend = select_backend(settings, simulate, LoggingObserver::new()).await?;

    let config = settings.stream_config();
    info!(
        backend = backend.name(),
        frames = frames.len(),
        interval_ms = config.interval.as_millis() as u64,
        "Streaming frames"
    );

    let controller = StreamController::new(
        backend.detector(),
        frames,
        config,
        Arc::new(ConsoleHandler {
            min_confidence: settings.detection.confidence,
        }),
    );
    controller.start();

    let stopped = wait_for_stop(duration).await;

    controller.stop();
    backend.shutdown();
    stopped?;

    let status = controller.status();
    println!(
        "Sent {} frame(s), skipped {} tick(s)",
        status.frames_sent, status.ticks_skipped
    );
    Ok(())
}

async fn wait_for_stop(duration: Option<Duration>) -> anyhow::Result<()> {
    match duration {
        Some(duration) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
                _ = tokio::time::sleep(duration) => {}
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?,
    }
    Ok(())
}

async fn status(settings: &Settings, simulate: bool) -> anyhow::Result<()> {
    if simulate {
        println!("simulator: always ready");
        return Ok(());
    }

    let manager = ConnectionManager::init(
        settings.client_config(),
        Arc::new(LoggingObserver::new().with_status_echo()),
    );
    println!("{}", *manager.status().borrow());

    let result = manager.connect().await;
    manager.disconnect();

    result.with_context(|| format!("failed to connect to {}", settings.server.url))
}
