pub mod admission;
pub mod analysis;
pub mod detection;
pub mod frame_publish;
pub mod managers;
pub mod orchestration;

pub use admission::{AdmissionDecision, AdmissionGate, AdmissionPermit, AdmissionSnapshot};
pub use detection::{DetectionService, FaceDetector, ScriptedDetector, SyntheticBlinkDetector};
pub use frame_publish::{PipelineEvent, ResultPublisher};
pub use managers::{EyeStateManager, EyeStateStats};
pub use orchestration::{AnalysisOutcome, PerformanceMonitor, PerformanceStats, PipelineCoordinator};
