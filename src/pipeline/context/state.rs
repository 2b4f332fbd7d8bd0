use crate::pipeline::types::FaceObservation;

// Markers to track the state of the frame processing pipeline
pub struct AdmittedState;
pub struct DetectedState {
    pub(super) faces: Vec<FaceObservation>,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for AdmittedState {
    fn state_name() -> &'static str {
        "Admitted"
    }
}

impl ProcessingState for DetectedState {
    fn state_name() -> &'static str {
        "Detected"
    }
}
