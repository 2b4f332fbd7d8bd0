use crate::pipeline::types::{BlinkEvent, DetectionResult};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Everything the pipeline hands to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum PipelineEvent {
    FaceDetected(DetectionResult),
    BlinkDetected(BlinkEvent),
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FaceDetected(_) => "faceDetected",
            Self::BlinkDetected(_) => "blinkDetected",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Fan-out result sink. Sending never blocks; events are dropped when no
/// one is subscribed and lagging subscribers lose the oldest events.
#[derive(Clone)]
pub struct ResultPublisher {
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl ResultPublisher {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<PipelineEvent>) {
        let (event_tx, event_rx) = broadcast::channel(capacity.max(1));
        (Self { event_tx }, event_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    pub fn publish_frame(&self, result: DetectionResult, blinks: Vec<BlinkEvent>) {
        let _ = self.event_tx.send(PipelineEvent::FaceDetected(result));
        for blink in blinks {
            debug!(
                "blink #{} on {} eye of face {}",
                blink.blink_count, blink.eye, blink.tracking_id
            );
            let _ = self.event_tx.send(PipelineEvent::BlinkDetected(blink));
        }
    }
}
