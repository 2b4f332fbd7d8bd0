use super::eye_state::EyeState;

/// Samples averaged arithmetically before switching to the moving average.
pub const CALIBRATION_SAMPLES: u32 = 30;
/// Weight of a new sample in the steady-state moving average.
pub const EMA_WEIGHT: f32 = 0.02;
/// Samples at or below this fraction of the average are not open evidence.
pub const OPEN_EVIDENCE_RATIO: f32 = 0.5;
/// Fraction of the average at which an eye is reported fully open.
pub const FULLY_OPEN_RATIO: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Openness {
    pub is_open: bool,
    pub open_probability: f32,
    pub threshold: f32,
}

/// Learns what "open" looks like for each eye and thresholds against it.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationTracker {
    blink_threshold: f32,
}

impl CalibrationTracker {
    pub fn new(blink_threshold: f32) -> Self {
        Self { blink_threshold }
    }

    pub fn blink_threshold(&self) -> f32 {
        self.blink_threshold
    }

    /// Folds `ear` into the eye's running average and classifies it.
    pub fn observe(&self, state: &mut EyeState, ear: f32) -> Openness {
        let ear = if ear.is_finite() { ear.max(0.0) } else { 0.0 };
        state.current_ear = ear;
        state.sample_count = state.sample_count.saturating_add(1);

        if state.sample_count <= CALIBRATION_SAMPLES {
            state.avg_ear += (ear - state.avg_ear) / state.sample_count as f32;
        } else if ear > state.avg_ear * OPEN_EVIDENCE_RATIO {
            state.avg_ear = state.avg_ear * (1.0 - EMA_WEIGHT) + ear * EMA_WEIGHT;
        }

        let threshold = self.adaptive_threshold(state.avg_ear);
        Openness {
            is_open: ear > threshold,
            open_probability: self.open_probability(ear, state.avg_ear),
            threshold,
        }
    }

    pub fn adaptive_threshold(&self, avg_ear: f32) -> f32 {
        avg_ear * self.blink_threshold
    }

    /// Linear ramp from the closed threshold up to `FULLY_OPEN_RATIO` of the
    /// average, clamped to `[0, 1]`.
    pub fn open_probability(&self, ear: f32, avg_ear: f32) -> f32 {
        let closed = self.adaptive_threshold(avg_ear);
        let open = avg_ear * FULLY_OPEN_RATIO;
        if open > closed {
            ((ear - closed) / (open - closed)).clamp(0.0, 1.0)
        } else if ear > closed {
            1.0
        } else {
            0.0
        }
    }
}
