use crate::error::DetectorError;
use crate::pipeline::types::{FaceObservation, FrameSnapshot};
use async_trait::async_trait;

/// Pluggable detector backend: given a frame, return zero or more faces.
/// The pipeline is written against this trait only.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, frame: &FrameSnapshot) -> Result<Vec<FaceObservation>, DetectorError>;
    fn name(&self) -> &'static str;
}
