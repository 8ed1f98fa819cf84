use crate::backend::DetectionBackend;
use crate::errors::ClientError;
use crate::manager::ConnectionManager;
use crate::metrics::ClientMetrics;
use crate::transport::Connector;
use async_trait::async_trait;
use parking_lot::Mutex;
use schema::{DetectionConfig, DetectionResponse, ImageData, RequestMode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_millis(200);
/// Shortest pacing the loop accepts; a zero interval is raised to this.
pub const MIN_STREAM_INTERVAL: Duration = Duration::from_millis(1);

/// Produces the next frame, or `None` when nothing is available this tick.
#[async_trait]
pub trait FrameSource: Send {
    async fn capture(&mut self) -> Option<ImageData>;
}

#[async_trait]
impl<F> FrameSource for F
where
    F: FnMut() -> Option<ImageData> + Send,
{
    async fn capture(&mut self) -> Option<ImageData> {
        self()
    }
}

pub trait StreamHandler: Send + Sync {
    fn on_result(&self, response: DetectionResponse);

    fn on_error(&self, error: ClientError);
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub interval: Duration,
    pub mode: RequestMode,
    pub detection: DetectionConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_STREAM_INTERVAL,
            mode: RequestMode::Webcam,
            detection: DetectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStatus {
    pub active: bool,
    pub processing: bool,
    pub frames_sent: u64,
    pub ticks_skipped: u64,
}

#[derive(Default)]
struct StreamFlags {
    active: AtomicBool,
    processing: AtomicBool,
    frames_sent: AtomicU64,
    ticks_skipped: AtomicU64,
}

/// Paced capture-and-send loop over a [`DetectionBackend`].
///
/// Each tick captures a frame and sends it unless the previous frame is
/// still in flight, in which case the tick is skipped. Created stopped.
pub struct StreamController {
    task: Arc<StreamTask>,
    running: Mutex<Option<CancellationToken>>,
}

struct StreamTask {
    backend: Arc<dyn DetectionBackend>,
    source: tokio::sync::Mutex<Box<dyn FrameSource>>,
    handler: Arc<dyn StreamHandler>,
    config: StreamConfig,
    flags: StreamFlags,
    metrics: ClientMetrics,
}

impl StreamController {
    pub fn new(
        backend: Arc<dyn DetectionBackend>,
        source: impl FrameSource + 'static,
        mut config: StreamConfig,
        handler: Arc<dyn StreamHandler>,
    ) -> Self {
        if config.interval < MIN_STREAM_INTERVAL {
            warn!(
                interval_ms = config.interval.as_millis() as u64,
                "Stream interval below minimum, using 1ms"
            );
            config.interval = MIN_STREAM_INTERVAL;
        }

        Self {
            task: Arc::new(StreamTask {
                backend,
                source: tokio::sync::Mutex::new(Box::new(source)),
                handler,
                config,
                flags: StreamFlags::default(),
                metrics: ClientMetrics::new(),
            }),
            running: Mutex::new(None),
        }
    }

    /// Returns false when already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            return false;
        }

        let token = CancellationToken::new();
        *running = Some(token.clone());
        self.task.flags.active.store(true, Ordering::Release);

        info!(
            backend = self.task.backend.name(),
            interval_ms = self.task.config.interval.as_millis() as u64,
            mode = %self.task.config.mode,
            "Stream started"
        );
        tokio::spawn(Arc::clone(&self.task).run(token));
        true
    }

    /// Stops the loop and abandons the frame in flight. Returns false when
    /// not running.
    pub fn stop(&self) -> bool {
        let Some(token) = self.running.lock().take() else {
            return false;
        };
        token.cancel();
        self.task.flags.active.store(false, Ordering::Release);
        self.task.flags.processing.store(false, Ordering::Release);

        info!(
            frames_sent = self.task.flags.frames_sent.load(Ordering::Relaxed),
            ticks_skipped = self.task.flags.ticks_skipped.load(Ordering::Relaxed),
            "Stream stopped"
        );
        true
    }

    pub fn is_active(&self) -> bool {
        self.task.flags.active.load(Ordering::Acquire)
    }

    pub fn status(&self) -> StreamStatus {
        let flags = &self.task.flags;
        StreamStatus {
            active: flags.active.load(Ordering::Acquire),
            processing: flags.processing.load(Ordering::Acquire),
            frames_sent: flags.frames_sent.load(Ordering::Relaxed),
            ticks_skipped: flags.ticks_skipped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        if let Some(token) = self.running.get_mut().take() {
            token.cancel();
        }
    }
}

impl StreamTask {
    async fn run(self: Arc<Self>, token: CancellationToken) {
        let period = self.config.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.flags.processing.load(Ordering::Acquire) {
                self.flags.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                self.metrics.tick_skipped();
                continue;
            }
            if !self.backend.is_ready() {
                debug!(backend = self.backend.name(), "Backend not ready, skipping tick");
                continue;
            }

            let frame = {
                let mut source = self.source.lock().await;
                tokio::select! {
                    _ = token.cancelled() => break,
                    frame = source.capture() => frame,
                }
            };
            let Some(image) = frame else {
                continue;
            };

            self.flags.processing.store(true, Ordering::Release);
            self.flags.frames_sent.fetch_add(1, Ordering::Relaxed);
            tokio::spawn(Arc::clone(&self).send_frame(image, token.clone()));
        }
    }

    async fn send_frame(self: Arc<Self>, image: ImageData, token: CancellationToken) {
        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = self.backend.detect(image, self.config.mode, &self.config.detection) => result,
        };

        match result {
            Ok(response) => self.handler.on_result(response),
            Err(e) => {
                debug!(error = %e, "Stream frame failed");
                self.handler.on_error(e);
            }
        }

        if !token.is_cancelled() {
            self.flags.processing.store(false, Ordering::Release);
        }
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Stream frames from `source` over this connection. The returned
    /// controller starts stopped.
    pub fn start_webcam_stream(
        &self,
        source: impl FrameSource + 'static,
        config: StreamConfig,
        handler: Arc<dyn StreamHandler>,
    ) -> StreamController {
        StreamController::new(Arc::new(self.clone()), source, config, handler)
    }
}
