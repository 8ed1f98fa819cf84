use crate::errors::SchemaError;
use crate::image::ImageData;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Value of the request `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Single still image; the service may estimate portions.
    #[default]
    Image,
    /// Frame from a continuous stream.
    Webcam,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Image => "image",
            RequestMode::Webcam => "webcam",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_portion_calculation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
}

fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            enable_portion_calculation: None,
            classes: None,
        }
    }
}

impl DetectionConfig {
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_portion_calculation(mut self, enabled: bool) -> Self {
        self.enable_portion_calculation = Some(enabled);
        self
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }
}

/// Envelope sent to the detection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRequest {
    #[serde(rename = "type")]
    pub mode: RequestMode,
    pub data: String,
    #[serde(default)]
    pub config: DetectionConfig,
}

impl DetectionRequest {
    pub fn new(
        mode: RequestMode,
        image: ImageData,
        config: DetectionConfig,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            mode,
            data: image.into_payload()?,
            config,
        })
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_request_envelope_shape() {
        let request = DetectionRequest::new(
            RequestMode::Webcam,
            ImageData::from("data:image/jpeg;base64,QUJD"),
            DetectionConfig::default()
                .with_confidence(0.65)
                .with_classes(["pilav", "tavuk"]),
        )
        .unwrap();

        let value: Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "webcam");
        assert_eq!(value["data"], "QUJD");
        assert_eq!(value["config"]["classes"], json!(["pilav", "tavuk"]));
        assert!((value["config"]["confidence"].as_f64().unwrap() - 0.65).abs() < 1e-6);
        assert!(
            value["config"].get("enablePortionCalculation").is_none(),
            "Unset options should be omitted"
        );
    }

    #[test]
    fn test_portion_flag_uses_camel_case() {
        let config = DetectionConfig::default().with_portion_calculation(true);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["enablePortionCalculation"], true);
    }

    #[test]
    fn test_confidence_defaults_when_missing() {
        let request =
            DetectionRequest::from_json(r#"{"type":"image","data":"QUJD","config":{}}"#).unwrap();
        assert_eq!(request.mode, RequestMode::Image);
        assert_eq!(request.config.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(DetectionConfig::default().with_confidence(1.7).confidence, 1.0);
        assert_eq!(DetectionConfig::default().with_confidence(-0.2).confidence, 0.0);
    }

    #[test]
    fn test_empty_image_fails_request_construction() {
        let result = DetectionRequest::new(
            RequestMode::Image,
            ImageData::Raw(Vec::new()),
            DetectionConfig::default(),
        );
        assert!(matches!(result, Err(SchemaError::EmptyImage)));
    }
}
