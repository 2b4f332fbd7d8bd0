use crate::pipeline::types::{EyeSide, TrackingId};
use std::time::Duration;

/// Registry key: one eye of one tracked face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EyeKey {
    pub tracking_id: TrackingId,
    pub side: EyeSide,
}

impl EyeKey {
    pub fn new(tracking_id: TrackingId, side: EyeSide) -> Self {
        Self { tracking_id, side }
    }
}

/// Temporal memory for one eye. Mutated only by the calibration tracker
/// and the blink state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeState {
    pub(crate) is_open: bool,
    pub(crate) was_open: bool,
    pub(crate) current_ear: f32,
    pub(crate) avg_ear: f32,
    pub(crate) sample_count: u32,
    pub(crate) last_open_time: Option<Duration>,
    pub(crate) last_closed_time: Option<Duration>,
    pub(crate) blink_count: u32,
}

impl Default for EyeState {
    fn default() -> Self {
        Self::new()
    }
}

impl EyeState {
    pub fn new() -> Self {
        Self {
            is_open: true,
            was_open: true,
            current_ear: 0.0,
            avg_ear: 0.0,
            sample_count: 0,
            last_open_time: None,
            last_closed_time: None,
            blink_count: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn was_open(&self) -> bool {
        self.was_open
    }

    pub fn current_ear(&self) -> f32 {
        self.current_ear
    }

    pub fn avg_ear(&self) -> f32 {
        self.avg_ear
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn last_open_time(&self) -> Option<Duration> {
        self.last_open_time
    }

    pub fn last_closed_time(&self) -> Option<Duration> {
        self.last_closed_time
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    /// A baseline exists once at least one positive sample has been averaged.
    pub fn is_calibrated(&self) -> bool {
        self.sample_count > 0 && self.avg_ear > 0.0
    }
}
