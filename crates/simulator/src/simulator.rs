use crate::catalog::{CATALOG, CatalogEntry};
use async_trait::async_trait;
use client::{ClientError, DetectionBackend};
use parking_lot::Mutex;
use schema::{
    BoundingBox, DetectedItem, DetectionConfig, DetectionResponse, ImageData, PORTION_STEPS,
    RequestMode, decode_payload, round_price,
};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Latency of an `image` request. `webcam` requests take half.
    pub delay: Duration,
    /// Fixed RNG seed for reproducible output.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(800),
            seed: None,
        }
    }
}

/// Offline stand-in for the detection service.
///
/// Fabricates responses in the wire schema from the built-in catalog.
/// `image` requests get 1-4 items with portion scaling, `webcam` requests
/// get 1-2 unscaled items with lower confidence.
pub struct Simulator {
    config: SimulatorConfig,
    rng: Mutex<fastrand::Rng>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn latency(&self, mode: RequestMode) -> Duration {
        match mode {
            RequestMode::Image => self.config.delay,
            RequestMode::Webcam => self.config.delay / 2,
        }
    }

    /// Build a response right away, without the simulated latency.
    pub fn generate(&self, mode: RequestMode, config: &DetectionConfig) -> DetectionResponse {
        let candidates: Vec<&CatalogEntry> = CATALOG
            .iter()
            .filter(|entry| match &config.classes {
                Some(classes) => classes.iter().any(|class| entry.matches(class)),
                None => true,
            })
            .collect();

        let mut rng = self.rng.lock();
        let processing_time = match mode {
            RequestMode::Image => 0.05 + rng.f64() * 0.15,
            RequestMode::Webcam => 0.02 + rng.f64() * 0.08,
        };

        if candidates.is_empty() {
            return DetectionResponse {
                success: true,
                total_price: Some(0.0),
                total_calories: Some(0.0),
                processing_time: Some(processing_time),
                ..DetectionResponse::default()
            };
        }

        let count = match mode {
            RequestMode::Image => rng.usize(1..=4),
            RequestMode::Webcam => rng.usize(1..=2),
        };
        let scale_portions = config.enable_portion_calculation != Some(false);

        let mut data = Vec::with_capacity(count);
        let mut total_price = 0.0;
        let mut total_calories = 0.0;

        for _ in 0..count {
            let entry = candidates[rng.usize(..candidates.len())];
            let confidence = match mode {
                RequestMode::Image => rng.u32(70..=97),
                RequestMode::Webcam => rng.u32(60..=79),
            } as f32
                / 100.0;
            if confidence < config.confidence {
                continue;
            }

            let bbox = random_bbox(&mut rng);
            let food_info = match mode {
                RequestMode::Image if scale_portions => {
                    let portion = PORTION_STEPS[rng.usize(..PORTION_STEPS.len())];
                    entry.food_info().scaled(portion)
                }
                RequestMode::Image => entry.food_info().scaled(1.0),
                RequestMode::Webcam => entry.food_info(),
            };

            total_price += food_info.effective_price();
            total_calories += food_info.calories;
            data.push(DetectedItem {
                class_name: entry.class_label(),
                confidence,
                bbox,
                segments: Some(bbox.outline()),
                food_info: Some(food_info),
            });
        }

        DetectionResponse {
            success: true,
            data,
            total_price: Some(round_price(total_price)),
            total_calories: Some(total_calories),
            processing_time: Some(processing_time),
            error: None,
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

fn random_bbox(rng: &mut fastrand::Rng) -> BoundingBox {
    let x1 = rng.u32(100..900) as f32;
    let y1 = rng.u32(100..500) as f32;
    let width = rng.u32(100..300) as f32;
    let height = rng.u32(100..250) as f32;

    BoundingBox {
        x1,
        y1,
        x2: x1 + width,
        y2: y1 + height,
    }
}

#[async_trait]
impl DetectionBackend for Simulator {
    async fn detect(
        &self,
        image: ImageData,
        mode: RequestMode,
        config: &DetectionConfig,
    ) -> Result<DetectionResponse, ClientError> {
        let payload = image.into_payload()?;
        if let Err(e) = decode_payload(&payload) {
            warn!(error = %e, "Simulator received undecodable image");
            return Ok(DetectionResponse::failure(format!("Invalid image data: {e}")));
        }

        tokio::time::sleep(self.latency(mode)).await;

        let response = self.generate(mode, config);
        debug!(
            mode = %mode,
            items = response.data.len(),
            "Simulated detection"
        );
        Ok(response)
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "simulator"
    }
}
