use crate::errors::SchemaError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// An image as handed to the client, before it goes on the wire.
///
/// `Encoded` holds base64 text, optionally wrapped in a `data:` URI.
/// `Raw` holds file bytes that still need encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    Encoded(String),
    Raw(Vec<u8>),
}

impl ImageData {
    /// Bare base64 payload suitable for the `data` field of a request.
    pub fn into_payload(self) -> Result<String, SchemaError> {
        let payload = match self {
            ImageData::Encoded(text) => match strip_data_uri(&text) {
                Some(stripped) => stripped.to_string(),
                None => text,
            },
            ImageData::Raw(bytes) => STANDARD.encode(bytes),
        };

        if payload.is_empty() {
            return Err(SchemaError::EmptyImage);
        }
        Ok(payload)
    }
}

impl From<Vec<u8>> for ImageData {
    fn from(bytes: Vec<u8>) -> Self {
        ImageData::Raw(bytes)
    }
}

impl From<String> for ImageData {
    fn from(text: String) -> Self {
        ImageData::Encoded(text)
    }
}

impl From<&str> for ImageData {
    fn from(text: &str) -> Self {
        ImageData::Encoded(text.to_string())
    }
}

/// Returns the payload after the comma of a `data:<mime>;base64,<payload>` URI.
///
/// Text that does not start with `data:` or that contains more than one comma
/// is not treated as a data URI.
pub fn strip_data_uri(text: &str) -> Option<&str> {
    if !text.starts_with("data:") {
        return None;
    }
    let mut parts = text.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), None) => Some(payload),
        _ => None,
    }
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>, SchemaError> {
    Ok(STANDARD.decode(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];

    #[test]
    fn test_data_uri_prefix_is_stripped() {
        let payload = STANDARD.encode(JPEG_HEAD);
        let prefix = "data:image/jpeg;base64,";
        let uri = format!("{prefix}{payload}");

        let sent = ImageData::from(uri.clone()).into_payload().unwrap();

        assert_eq!(sent, payload);
        assert_eq!(sent.len(), uri.len() - prefix.len());
    }

    #[test]
    fn test_bare_base64_passes_through() {
        let payload = STANDARD.encode(JPEG_HEAD);
        let sent = ImageData::from(payload.as_str()).into_payload().unwrap();
        assert_eq!(sent, payload);
    }

    #[test]
    fn test_raw_bytes_are_encoded() {
        let sent = ImageData::from(JPEG_HEAD.to_vec()).into_payload().unwrap();
        assert_eq!(decode_payload(&sent).unwrap(), JPEG_HEAD);
    }

    #[test]
    fn test_data_uri_with_extra_commas_is_left_alone() {
        let text = "data:image/png;base64,AAAA,BBBB";
        assert_eq!(strip_data_uri(text), None);
        assert_eq!(
            ImageData::from(text).into_payload().unwrap(),
            text,
            "Ambiguous URIs should be sent unchanged"
        );
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        assert!(matches!(
            ImageData::Raw(Vec::new()).into_payload(),
            Err(SchemaError::EmptyImage)
        ));
        assert!(matches!(
            ImageData::from("data:image/png;base64,").into_payload(),
            Err(SchemaError::EmptyImage)
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_payload("%%%"),
            Err(SchemaError::Base64(_))
        ));
    }
}
