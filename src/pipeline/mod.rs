pub mod context;
pub mod services;
pub mod types;

pub use services::{FaceDetector, PipelineEvent, ResultPublisher};
pub use types::{BlinkEvent, DetectionResult, EyeResult, EyeSide, FaceObservation, FaceResult, VideoFrame};
