use crate::pipeline::services::analysis::{EyeKey, EyeState};
use crate::pipeline::types::{EyeSide, TrackingId};
use indexmap::IndexMap;

/// Keyed registry of per-eye temporal state. Each `(tracking id, side)`
/// pair owns its own calibration; nothing is shared between eyes or faces.
pub struct EyeStateManager {
    eye_states: IndexMap<EyeKey, EyeState>,
}

impl EyeStateManager {
    pub fn new() -> Self {
        Self {
            eye_states: IndexMap::new(),
        }
    }

    /// Get or create eye state
    pub fn get_or_create(&mut self, key: EyeKey) -> &mut EyeState {
        self.eye_states.entry(key).or_default()
    }

    pub fn get(&self, key: &EyeKey) -> Option<&EyeState> {
        self.eye_states.get(key)
    }

    pub fn get_eye(&self, tracking_id: TrackingId, side: EyeSide) -> Option<&EyeState> {
        self.get(&EyeKey::new(tracking_id, side))
    }

    /// Forget both eyes of a face that is no longer tracked.
    pub fn clear_face(&mut self, tracking_id: TrackingId) {
        for side in EyeSide::BOTH {
            self.eye_states.shift_remove(&EyeKey::new(tracking_id, side));
        }
    }

    pub fn clear(&mut self) {
        self.eye_states.clear();
    }

    pub fn len(&self) -> usize {
        self.eye_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eye_states.is_empty()
    }

    /// Tracked keys in first-seen order.
    pub fn tracked_eyes(&self) -> Vec<EyeKey> {
        self.eye_states.keys().copied().collect()
    }

    pub fn get_stats(&self) -> EyeStateStats {
        EyeStateStats {
            tracked_eyes: self.eye_states.len(),
            calibrated_eyes: self.eye_states.values().filter(|s| s.is_calibrated()).count(),
            total_blinks: self.eye_states.values().map(|s| s.blink_count() as u64).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EyeStateStats {
    pub tracked_eyes: usize,
    pub calibrated_eyes: usize,
    pub total_blinks: u64,
}

impl Default for EyeStateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::services::analysis::CalibrationTracker;

    #[test]
    fn keys_are_isolated_per_face_and_side() {
        let tracker = CalibrationTracker::new(0.5);
        let mut manager = EyeStateManager::new();
        tracker.observe(manager.get_or_create(EyeKey::new(1, EyeSide::Left)), 0.3);
        tracker.observe(manager.get_or_create(EyeKey::new(1, EyeSide::Right)), 0.1);
        tracker.observe(manager.get_or_create(EyeKey::new(2, EyeSide::Left)), 0.05);

        assert_eq!(manager.len(), 3);
        assert_eq!(manager.get_eye(1, EyeSide::Left).unwrap().avg_ear(), 0.3);
        assert_eq!(manager.get_eye(1, EyeSide::Right).unwrap().avg_ear(), 0.1);
        assert_eq!(manager.get_eye(2, EyeSide::Left).unwrap().avg_ear(), 0.05);
        assert_eq!(
            manager.tracked_eyes(),
            vec![
                EyeKey::new(1, EyeSide::Left),
                EyeKey::new(1, EyeSide::Right),
                EyeKey::new(2, EyeSide::Left)
            ]
        );
    }

    #[test]
    fn clear_face_and_clear() {
        let mut manager = EyeStateManager::new();
        manager.get_or_create(EyeKey::new(1, EyeSide::Left));
        manager.get_or_create(EyeKey::new(1, EyeSide::Right));
        manager.get_or_create(EyeKey::new(2, EyeSide::Right));
        manager.clear_face(1);
        assert_eq!(manager.tracked_eyes(), vec![EyeKey::new(2, EyeSide::Right)]);
        manager.clear();
        assert!(manager.is_empty());
        assert_eq!(manager.get_stats().tracked_eyes, 0);
    }
}
