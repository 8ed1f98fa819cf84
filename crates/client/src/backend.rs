use crate::errors::ClientError;
use crate::manager::ConnectionManager;
use crate::transport::Connector;
use async_trait::async_trait;
use schema::{DetectionConfig, DetectionResponse, ImageData, RequestMode};

/// Anything that turns an image into a detection result.
///
/// The live connection and the offline simulator both implement this, so
/// callers pick one up front instead of branching on every request.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    async fn detect(
        &self,
        image: ImageData,
        mode: RequestMode,
        config: &DetectionConfig,
    ) -> Result<DetectionResponse, ClientError>;

    /// Whether a detect call can be served right now.
    fn is_ready(&self) -> bool;

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<C: Connector> DetectionBackend for ConnectionManager<C> {
    async fn detect(
        &self,
        image: ImageData,
        mode: RequestMode,
        config: &DetectionConfig,
    ) -> Result<DetectionResponse, ClientError> {
        self.send_image(image, mode, config).await
    }

    fn is_ready(&self) -> bool {
        self.is_connected()
    }

    fn name(&self) -> &'static str {
        "live"
    }
}
