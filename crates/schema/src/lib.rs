//! Wire protocol spoken with the detection service.
//!
//! Requests and responses are JSON text frames. See [`DetectionRequest`] and
//! [`DetectionResponse`] for the envelopes.

pub mod errors;
pub mod image;
pub mod portion;
pub mod request;
pub mod response;

pub use errors::SchemaError;
pub use image::{ImageData, decode_payload, strip_data_uri};
pub use portion::{PORTION_STEPS, round_price, round_to_nearest_portion, scale_nutrition_value};
pub use request::{DEFAULT_CONFIDENCE, DetectionConfig, DetectionRequest, RequestMode};
pub use response::{BoundingBox, DetectedItem, DetectionResponse, FoodInfo, Nutrition, Totals};
