use std::pin::Pin;
use std::sync::Arc;

use crate::error::DetectorError;
use crate::pipeline::context::{AdmittedState, DetectedState, FrameContext};
use crate::pipeline::services::detection::FaceDetector;
use futures::task::{Context, Poll};
use futures::Future;
use tower::util::BoxService;
use tower::ServiceBuilder;
use tower::Service;

use super::instrumented::InstrumentedLayer;

pub type BoxedDetectionService =
    BoxService<FrameContext<AdmittedState>, FrameContext<DetectedState>, DetectorError>;

/// Adapts a `FaceDetector` backend into a tower `Service` over frame contexts.
#[derive(Clone)]
pub struct DetectionService {
    inner: Arc<dyn FaceDetector>,
}

impl DetectionService {
    pub fn new(inner: Arc<dyn FaceDetector>) -> Self {
        Self { inner }
    }

    /// Detection service wrapped with timing and failure logging.
    pub fn boxed(inner: Arc<dyn FaceDetector>) -> BoxedDetectionService {
        let name = inner.name();
        let service = ServiceBuilder::new()
            .layer(InstrumentedLayer::new(name))
            .service(DetectionService::new(inner));
        BoxService::new(service)
    }
}

impl Service<FrameContext<AdmittedState>> for DetectionService {
    type Response = FrameContext<DetectedState>;
    type Error = DetectorError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FrameContext<AdmittedState>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let faces = inner.detect(req.snapshot()).await?;
            Ok(req.into_detected(faces))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::services::admission::AdmissionGate;
    use crate::pipeline::services::detection::ScriptedDetector;
    use crate::pipeline::types::{FaceObservation, FrameSnapshot, PixelBuffer, VideoFrame};
    use std::time::Duration;
    use tower::ServiceExt;

    fn admitted(gate: &Arc<AdmissionGate>) -> FrameContext<AdmittedState> {
        let data = vec![0u8; 2 * 2 * 3];
        let frame = VideoFrame::new(
            2,
            2,
            Duration::from_millis(1),
            PixelBuffer::Rgb8 {
                data: &data,
                stride: 6,
            },
        );
        let snapshot = FrameSnapshot::capture(&frame).unwrap();
        FrameContext::new(snapshot, gate.try_admit(1).unwrap())
    }

    #[tokio::test]
    async fn test_detection_service() {
        let detector = Arc::new(ScriptedDetector::new());
        detector.push_faces(vec![FaceObservation::default()]);
        let gate = AdmissionGate::new();

        let mut service = DetectionService::boxed(detector.clone());
        let detected = service
            .ready()
            .await
            .unwrap()
            .call(admitted(&gate))
            .await
            .unwrap();
        assert_eq!(detected.faces().len(), 1);
        assert!(detected.metrics().detection_duration().is_some());
        assert!(gate.is_busy());
        drop(detected);
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn failed_detection_releases_permit() {
        let detector = Arc::new(ScriptedDetector::new());
        detector.push_failure("model crashed");
        let gate = AdmissionGate::new();

        let mut service = DetectionService::boxed(detector);
        let result = service.ready().await.unwrap().call(admitted(&gate)).await;
        assert!(matches!(result, Err(DetectorError::Backend { .. })));
        assert!(!gate.is_busy());
    }
}
