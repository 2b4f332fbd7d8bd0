pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;

pub use crate::config::{Configuration, Settings};
pub use crate::coordinator::{BlinkPipeline, BlinkPipelineBuilder, FrameDisposition};
pub use crate::error::{AppError, DetectorError, FrameError, LifecycleError};
pub use crate::pipeline::{
    BlinkEvent, DetectionResult, EyeResult, EyeSide, FaceDetector, FaceObservation, FaceResult,
    PipelineEvent, ResultPublisher, VideoFrame,
};
