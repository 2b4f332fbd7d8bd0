use std::f32::consts::TAU;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::DetectorError;
use crate::pipeline::services::detection::FaceDetector;
use crate::pipeline::types::{BoundingBox, EyeLandmarks, FaceObservation, FrameSnapshot, HeadPose, Point};

const CONTOUR_POINTS: usize = 16;
const CLOSED_HEIGHT_RATIO: f32 = 0.15;

/// `n` points on an axis-aligned ellipse, counter-clockwise from the outer corner.
pub fn ellipse_contour(center: Point, width: f32, height: f32, n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let theta = TAU * i as f32 / n as f32;
            Point::new(
                center.x + width / 2.0 * theta.cos(),
                center.y + height / 2.0 * theta.sin(),
            )
        })
        .collect()
}

/// Generates one face whose eyes close for `blink_duration` at the start of
/// every `blink_period`, driven by frame timestamps. Serves as a stand-in
/// backend for demos and soak runs.
pub struct SyntheticBlinkDetector {
    tracking_id: i64,
    blink_period: Duration,
    blink_duration: Duration,
    noise: f32,
    rng: Mutex<StdRng>,
}

impl SyntheticBlinkDetector {
    pub fn new(tracking_id: i64) -> Self {
        Self {
            tracking_id,
            blink_period: Duration::from_secs(3),
            blink_duration: Duration::from_millis(150),
            noise: 0.0,
            rng: Mutex::new(StdRng::seed_from_u64(tracking_id as u64)),
        }
    }

    pub fn with_blink_period(mut self, period: Duration) -> Self {
        self.blink_period = period.max(Duration::from_millis(1));
        self
    }

    pub fn with_blink_duration(mut self, duration: Duration) -> Self {
        self.blink_duration = duration;
        self
    }

    /// Uniform jitter applied to every contour point, in pixels.
    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise.abs();
        self
    }

    pub fn is_closed_at(&self, timestamp: Duration) -> bool {
        let phase = timestamp.as_nanos() % self.blink_period.as_nanos();
        phase < self.blink_duration.as_nanos()
    }

    fn eye(&self, rng: &mut StdRng, center: Point, width: f32, height: f32) -> EyeLandmarks {
        let points = ellipse_contour(center, width, height, CONTOUR_POINTS)
            .into_iter()
            .map(|p| {
                Point::new(
                    p.x + rng.random_range(-self.noise..=self.noise),
                    p.y + rng.random_range(-self.noise..=self.noise),
                )
            })
            .collect();
        EyeLandmarks::new(points)
    }
}

#[async_trait]
impl FaceDetector for SyntheticBlinkDetector {
    async fn detect(&self, frame: &FrameSnapshot) -> Result<Vec<FaceObservation>, DetectorError> {
        let (w, h) = (frame.width as f32, frame.height as f32);
        let eye_width = w * 0.12;
        let open_height = eye_width * 0.35;
        let height = if self.is_closed_at(frame.timestamp) {
            open_height * CLOSED_HEIGHT_RATIO
        } else {
            open_height
        };

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let left_eye = self.eye(&mut rng, Point::new(w * 0.38, h * 0.42), eye_width, height);
        let right_eye = self.eye(&mut rng, Point::new(w * 0.62, h * 0.42), eye_width, height);

        Ok(vec![FaceObservation {
            bounds: BoundingBox {
                x: w * 0.25,
                y: h * 0.2,
                width: w * 0.5,
                height: h * 0.6,
            },
            confidence: 0.98,
            tracking_id: Some(self.tracking_id),
            head_pose: Some(HeadPose::default()),
            left_eye: Some(left_eye),
            right_eye: Some(right_eye),
        }])
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
