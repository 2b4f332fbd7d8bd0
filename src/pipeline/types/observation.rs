use serde::{Deserialize, Serialize};

/// Stable identifier assigned by the detector to follow one physical face.
pub type TrackingId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    pub const BOTH: [EyeSide; 2] = [EyeSide::Left, EyeSide::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for EyeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Ordered contour points for one eye, in pixel or frame-normalized space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EyeLandmarks {
    pub points: Vec<Point>,
}

impl EyeLandmarks {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Centroid of the contour, `None` when there are no points.
    pub fn center(&self) -> Option<Point> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f32;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

/// One face reported by a detector backend for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bounds: BoundingBox,
    pub confidence: f32,
    pub tracking_id: Option<TrackingId>,
    pub head_pose: Option<HeadPose>,
    /// `None` when the detector could not resolve the contour this frame.
    pub left_eye: Option<EyeLandmarks>,
    pub right_eye: Option<EyeLandmarks>,
}

impl FaceObservation {
    pub fn eye(&self, side: EyeSide) -> Option<&EyeLandmarks> {
        match side {
            EyeSide::Left => self.left_eye.as_ref(),
            EyeSide::Right => self.right_eye.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_centroid_of_points() {
        let eye = EyeLandmarks::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert_eq!(eye.center(), Some(Point::new(2.0, 1.0)));
        assert_eq!(EyeLandmarks::default().center(), None);
    }

    #[test]
    fn eye_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EyeSide::Left).unwrap(), "\"left\"");
        assert_eq!(EyeSide::Right.to_string(), "right");
    }
}
