mod detection_result;
mod frame;
mod observation;

pub use detection_result::{BlinkEvent, DetectionResult, EyeResult, FaceResult};
pub use frame::{FrameSnapshot, PixelBuffer, SourceKind, VideoFrame};
pub use observation::{BoundingBox, EyeLandmarks, EyeSide, FaceObservation, HeadPose, Point, TrackingId};
