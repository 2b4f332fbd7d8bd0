pub mod eye_state_manager;

pub use eye_state_manager::{EyeStateManager, EyeStateStats};
