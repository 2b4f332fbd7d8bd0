//! Eye aspect ratio from an eye contour, sampled along the lids.
use crate::pipeline::types::Point;

/// Fewer points than this cannot describe both lids.
pub const MIN_CONTOUR_POINTS: usize = 6;
/// Reported when the contour is too sparse or degenerate to measure.
pub const NEUTRAL_EAR: f32 = 0.3;

const MIN_HORIZONTAL_EXTENT: f32 = 1e-6;
const SAMPLE_POSITIONS: [f32; 3] = [0.25, 0.5, 0.75];
const SAMPLE_BAND: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarMethod {
    LidSamples,
    BoundingBox,
    Insufficient,
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarMeasurement {
    pub value: f32,
    pub method: EarMethod,
}

impl EarMeasurement {
    fn neutral(method: EarMethod) -> Self {
        Self {
            value: NEUTRAL_EAR,
            method,
        }
    }
}

pub fn eye_aspect_ratio(points: &[Point]) -> f32 {
    measure(points).value
}

pub fn measure(points: &[Point]) -> EarMeasurement {
    if points.len() < MIN_CONTOUR_POINTS {
        return EarMeasurement::neutral(EarMethod::Insufficient);
    }

    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let width = max_x - min_x;
    if !width.is_finite() || width < MIN_HORIZONTAL_EXTENT {
        return EarMeasurement::neutral(EarMethod::Degenerate);
    }

    let band = width * SAMPLE_BAND;
    let mut total = 0.0;
    let mut samples = 0;
    for fraction in SAMPLE_POSITIONS {
        let sample_x = min_x + width * fraction;
        if let Some(opening) = lid_opening(points, sample_x, band) {
            total += opening;
            samples += 1;
        }
    }

    if samples == 0 {
        return EarMeasurement {
            value: ((max_y - min_y) / width).max(0.0),
            method: EarMethod::BoundingBox,
        };
    }

    EarMeasurement {
        value: (total / samples as f32) / width,
        method: EarMethod::LidSamples,
    }
}

// Vertical gap between the highest and lowest contour points near `sample_x`.
fn lid_opening(points: &[Point], sample_x: f32, band: f32) -> Option<f32> {
    let mut upper: Option<f32> = None;
    let mut lower: Option<f32> = None;
    for p in points.iter().filter(|p| (p.x - sample_x).abs() <= band) {
        upper = Some(upper.map_or(p.y, |u| u.max(p.y)));
        lower = Some(lower.map_or(p.y, |l| l.min(p.y)));
    }
    match (upper, lower) {
        (Some(upper), Some(lower)) if upper > lower => Some(upper - lower),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::services::detection::ellipse_contour;

    #[test]
    fn sparse_contour_is_neutral() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        let m = measure(&points);
        assert_eq!(m.method, EarMethod::Insufficient);
        assert_eq!(m.value, NEUTRAL_EAR);
        assert_eq!(eye_aspect_ratio(&[]), NEUTRAL_EAR);
    }

    #[test]
    fn vertical_line_is_degenerate() {
        let points: Vec<Point> = (0..8).map(|i| Point::new(3.0, i as f32)).collect();
        assert_eq!(measure(&points).method, EarMethod::Degenerate);
    }

    #[test]
    fn open_ellipse_uses_lid_samples() {
        let points = ellipse_contour(Point::new(50.0, 50.0), 30.0, 10.0, 16);
        let m = measure(&points);
        assert_eq!(m.method, EarMethod::LidSamples);
        assert!(m.value > 0.25 && m.value < 0.34, "ear = {}", m.value);
    }

    #[test]
    fn ear_decreases_as_eye_closes() {
        let mut previous = f32::INFINITY;
        for step in 0..10 {
            let height = 12.0 - step as f32 * 1.2;
            let points = ellipse_contour(Point::new(0.0, 0.0), 30.0, height, 16);
            let ear = eye_aspect_ratio(&points);
            assert!(ear < previous, "step {step}: {ear} !< {previous}");
            previous = ear;
        }
    }

    #[test]
    fn falls_back_to_bounding_box_when_no_band_has_both_lids() {
        // Points only at the eye corners, nothing near the sample positions.
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 2.0),
            Point::new(0.5, 1.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 2.0),
            Point::new(9.5, 1.0),
        ];
        let m = measure(&points);
        assert_eq!(m.method, EarMethod::BoundingBox);
        assert!((m.value - 0.2).abs() < 1e-6);
    }
}
