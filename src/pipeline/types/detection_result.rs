use super::observation::{BoundingBox, EyeSide, HeadPose, Point, TrackingId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Serializes monotonic timestamps as fractional milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(millis.max(0.0) / 1000.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeResult {
    pub position: Point,
    pub is_open: bool,
    pub open_probability: f32,
    pub ear: f32,
    pub avg_ear: f32,
    pub blink_count: u32,
}

impl Default for EyeResult {
    // Reported for untracked faces and uncalibrated eyes with no contour.
    fn default() -> Self {
        Self {
            position: Point::default(),
            is_open: true,
            open_probability: 1.0,
            ear: 0.0,
            avg_ear: 0.0,
            blink_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceResult {
    pub bounds: BoundingBox,
    pub confidence: f32,
    pub tracking_id: Option<TrackingId>,
    pub head_pose: Option<HeadPose>,
    pub left_eye: EyeResult,
    pub right_eye: EyeResult,
}

impl FaceResult {
    pub fn eye(&self, side: EyeSide) -> &EyeResult {
        match side {
            EyeSide::Left => &self.left_eye,
            EyeSide::Right => &self.right_eye,
        }
    }
}

/// Aggregate output for one analyzed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub frame_id: Uuid,
    pub faces: Vec<FaceResult>,
    #[serde(with = "duration_millis")]
    pub timestamp: Duration,
    pub emitted_at: DateTime<Utc>,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// A validated blink on one eye of one tracked face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkEvent {
    #[serde(with = "duration_millis")]
    pub timestamp: Duration,
    pub eye: EyeSide,
    pub tracking_id: TrackingId,
    pub blink_count: u32,
    #[serde(with = "duration_millis")]
    pub closed_duration: Duration,
}
