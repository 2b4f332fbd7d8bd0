use crate::pipeline::context::metrics::FrameMetrics;
use crate::pipeline::context::state::{AdmittedState, DetectedState, ProcessingState};
use crate::pipeline::services::admission::AdmissionPermit;
use crate::pipeline::types::{FaceObservation, FrameSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};

// FrameContext with compile-time state tracking. It carries the admission
// permit, so dropping the context at any stage reopens the gate.
pub struct FrameContext<S> {
    snapshot: Arc<FrameSnapshot>,
    permit: AdmissionPermit,
    metrics: FrameMetrics,
    processing_start: Instant,
    state: S,
}

impl<S> FrameContext<S> {
    pub fn snapshot(&self) -> &FrameSnapshot {
        &self.snapshot
    }

    pub fn shared_snapshot(&self) -> Arc<FrameSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn frame_number(&self) -> u64 {
        self.permit.frame_number()
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }
}

impl<S: ProcessingState> FrameContext<S> {
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}

impl FrameContext<AdmittedState> {
    pub fn new(snapshot: FrameSnapshot, permit: AdmissionPermit) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            permit,
            metrics: FrameMetrics::new(),
            processing_start: Instant::now(),
            state: AdmittedState,
        }
    }

    pub fn into_detected(mut self, faces: Vec<FaceObservation>) -> FrameContext<DetectedState> {
        self.metrics.record_detection_duration(self.elapsed());
        FrameContext::<DetectedState> {
            snapshot: self.snapshot,
            permit: self.permit,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: DetectedState { faces },
        }
    }
}

impl FrameContext<DetectedState> {
    pub fn faces(&self) -> &[FaceObservation] {
        &self.state.faces
    }

    pub fn record_analysis_complete(&mut self) {
        let total = self.elapsed();
        self.metrics.finalize(total);
    }
}
