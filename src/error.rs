use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Lifecycle Error: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Frame Error: {0}")]
    Frame(#[from] FrameError),
    #[error("Detector Error: {0}")]
    Detector(#[from] DetectorError),
}

// Control-layer misuse, the only errors surfaced to callers of the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("The pipeline is already enabled.")]
    AlreadyEnabled,
    #[error("Face detection requires a video source, got {0}.")]
    NonVideoSource(String),
    #[error("Face detection is administratively disabled.")]
    AdministrativelyDisabled,
    #[error("No tokio runtime is available to host the analysis worker.")]
    NoRuntime,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("{plane} plane holds {actual} bytes, expected at least {expected}")]
    BufferTooSmall {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Unsupported frame rotation: {0} degrees")]
    InvalidRotation(u32),
    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("Detector backend '{backend}' failed: {reason}")]
    Backend {
        backend: &'static str,
        reason: String,
    },
    #[error("Detector backend '{0}' is unavailable")]
    Unavailable(&'static str),
}
