pub mod detection_service;
pub mod face_detector;
pub mod instrumented;
pub mod scripted;
pub mod synthetic;

pub use detection_service::{BoxedDetectionService, DetectionService};
pub use face_detector::FaceDetector;
pub use instrumented::{Instrumented, InstrumentedLayer};
pub use scripted::ScriptedDetector;
pub use synthetic::{ellipse_contour, SyntheticBlinkDetector};
