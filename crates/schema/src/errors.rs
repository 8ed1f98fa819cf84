use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image payload is empty")]
    EmptyImage,
}
