pub mod blink_state_machine;
pub mod calibration;
pub mod eye_aspect_ratio;
pub mod eye_state;

pub use blink_state_machine::{BlinkStateMachine, Transition};
pub use calibration::{CalibrationTracker, Openness};
pub use eye_aspect_ratio::{eye_aspect_ratio, EarMeasurement, EarMethod};
pub use eye_state::{EyeKey, EyeState};
