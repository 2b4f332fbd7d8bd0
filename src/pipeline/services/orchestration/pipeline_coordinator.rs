use crate::config::Configuration;
use crate::pipeline::context::{DetectedState, FrameContext};
use crate::pipeline::services::analysis::{
    eye_aspect_ratio, BlinkStateMachine, CalibrationTracker, EyeKey, EyeState,
};
use crate::pipeline::services::managers::{EyeStateManager, EyeStateStats};
use crate::pipeline::types::{
    BlinkEvent, DetectionResult, EyeLandmarks, EyeResult, EyeSide, FaceObservation, FaceResult,
    TrackingId,
};
use chrono::Utc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Output of analyzing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub result: DetectionResult,
    pub blinks: Vec<BlinkEvent>,
}

/// Drives geometry, calibration and the blink state machine for every eye
/// of every face in a frame, and owns the per-eye registry.
pub struct PipelineCoordinator {
    eye_states: EyeStateManager,
    calibration: CalibrationTracker,
    blink_machine: BlinkStateMachine,
}

impl PipelineCoordinator {
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            eye_states: EyeStateManager::new(),
            calibration: CalibrationTracker::new(configuration.effective_blink_threshold()),
            blink_machine: BlinkStateMachine::new(),
        }
    }

    /// Applies a new session's tunables. Calibration state is kept; callers
    /// reset explicitly when it should be forgotten.
    pub fn configure(&mut self, configuration: &Configuration) {
        self.calibration = CalibrationTracker::new(configuration.effective_blink_threshold());
    }

    pub fn analyze(&mut self, context: &FrameContext<DetectedState>) -> AnalysisOutcome {
        let snapshot = context.snapshot();
        self.analyze_faces(
            snapshot.id,
            context.faces(),
            snapshot.timestamp,
            snapshot.width,
            snapshot.height,
        )
    }

    pub fn analyze_faces(
        &mut self,
        frame_id: Uuid,
        faces: &[FaceObservation],
        timestamp: Duration,
        frame_width: u32,
        frame_height: u32,
    ) -> AnalysisOutcome {
        let mut blinks = Vec::new();
        let faces = faces
            .iter()
            .map(|face| FaceResult {
                bounds: face.bounds,
                confidence: face.confidence,
                tracking_id: face.tracking_id,
                head_pose: face.head_pose,
                left_eye: self.analyze_eye(face, EyeSide::Left, timestamp, &mut blinks),
                right_eye: self.analyze_eye(face, EyeSide::Right, timestamp, &mut blinks),
            })
            .collect();

        AnalysisOutcome {
            result: DetectionResult {
                frame_id,
                faces,
                timestamp,
                emitted_at: Utc::now(),
                frame_width,
                frame_height,
            },
            blinks,
        }
    }

    fn analyze_eye(
        &mut self,
        face: &FaceObservation,
        side: EyeSide,
        now: Duration,
        blinks: &mut Vec<BlinkEvent>,
    ) -> EyeResult {
        let landmarks = face.eye(side).filter(|eye| !eye.is_empty());
        let position = landmarks.and_then(EyeLandmarks::center).unwrap_or_default();

        // Untracked faces cannot be followed across frames.
        let Some(tracking_id) = face.tracking_id else {
            return EyeResult {
                position,
                ..EyeResult::default()
            };
        };

        let (mut eye, blink) = match landmarks {
            Some(landmarks) => {
                let ear = eye_aspect_ratio::measure(&landmarks.points);
                self.observe_ear(tracking_id, side, ear.value, now)
            }
            None => self.observe_missing(tracking_id, side, now),
        };
        blinks.extend(blink);
        eye.position = position;
        eye
    }

    /// Feeds one EAR sample for an eye through calibration and the blink
    /// state machine.
    pub fn observe_ear(
        &mut self,
        tracking_id: TrackingId,
        side: EyeSide,
        ear: f32,
        now: Duration,
    ) -> (EyeResult, Option<BlinkEvent>) {
        let key = EyeKey::new(tracking_id, side);
        let state = self.eye_states.get_or_create(key);
        let openness = self.calibration.observe(state, ear);
        let blink = self
            .blink_machine
            .advance(key, state, openness.is_open, now)
            .blink();

        debug!(
            "eye {}/{}: ear={:.3} avg={:.3} threshold={:.3} open={}",
            tracking_id,
            side,
            state.current_ear(),
            state.avg_ear(),
            openness.threshold,
            openness.is_open
        );

        let eye = EyeResult {
            open_probability: openness.open_probability,
            ..Self::eye_result(state)
        };
        (eye, blink)
    }

    /// The face was seen but this eye's contour was not resolved.
    pub fn observe_missing(
        &mut self,
        tracking_id: TrackingId,
        side: EyeSide,
        now: Duration,
    ) -> (EyeResult, Option<BlinkEvent>) {
        let key = EyeKey::new(tracking_id, side);
        let state = self.eye_states.get_or_create(key);
        match self.blink_machine.advance_missing(key, state, now) {
            Some(transition) => {
                let eye = EyeResult {
                    open_probability: 0.0,
                    ..Self::eye_result(state)
                };
                (eye, transition.blink())
            }
            None => {
                let eye = EyeResult {
                    is_open: true,
                    open_probability: 1.0,
                    ..Self::eye_result(state)
                };
                (eye, None)
            }
        }
    }

    fn eye_result(state: &EyeState) -> EyeResult {
        EyeResult {
            position: Default::default(),
            is_open: state.is_open(),
            open_probability: if state.is_open() { 1.0 } else { 0.0 },
            ear: state.current_ear(),
            avg_ear: state.avg_ear(),
            blink_count: state.blink_count(),
        }
    }

    pub fn eye_state(&self, tracking_id: TrackingId, side: EyeSide) -> Option<&EyeState> {
        self.eye_states.get_eye(tracking_id, side)
    }

    /// Forgets all calibration and blink counts.
    pub fn reset(&mut self) {
        self.eye_states.clear();
    }

    pub fn stats(&self) -> EyeStateStats {
        self.eye_states.get_stats()
    }
}
