use super::eye_state::{EyeKey, EyeState};
use crate::pipeline::types::BlinkEvent;
use std::time::Duration;
use tracing::debug;

/// Closures at or below this are detector jitter.
pub const MIN_BLINK_DURATION: Duration = Duration::from_millis(50);
/// Closures at or above this are deliberate, not blinks.
pub const MAX_BLINK_DURATION: Duration = Duration::from_millis(400);
/// Missing contours count as closed only after this many samples.
pub const MISSING_AS_CLOSED_AFTER: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    StayedOpen,
    StayedClosed,
    Closed,
    Reopened { closed_duration: Duration },
    Blinked(BlinkEvent),
}

impl Transition {
    pub fn blink(&self) -> Option<BlinkEvent> {
        match self {
            Self::Blinked(event) => Some(*event),
            _ => None,
        }
    }
}

/// Open/closed state machine with a timing gate on reopen.
#[derive(Debug, Clone, Copy)]
pub struct BlinkStateMachine {
    min_duration: Duration,
    max_duration: Duration,
}

impl Default for BlinkStateMachine {
    fn default() -> Self {
        Self {
            min_duration: MIN_BLINK_DURATION,
            max_duration: MAX_BLINK_DURATION,
        }
    }
}

impl BlinkStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_blink(&self, closed_duration: Duration) -> bool {
        closed_duration > self.min_duration && closed_duration < self.max_duration
    }

    pub fn advance(&self, key: EyeKey, state: &mut EyeState, is_open: bool, now: Duration) -> Transition {
        state.was_open = state.is_open;
        state.is_open = is_open;

        match (state.was_open, is_open) {
            (true, true) => {
                state.last_open_time = Some(now);
                Transition::StayedOpen
            }
            (false, false) => Transition::StayedClosed,
            (true, false) => {
                state.last_closed_time = Some(now);
                Transition::Closed
            }
            (false, true) => {
                state.last_open_time = Some(now);
                let closed_duration = state
                    .last_closed_time
                    .map(|closed_at| now.saturating_sub(closed_at))
                    .unwrap_or_default();

                if !self.is_valid_blink(closed_duration) {
                    debug!(
                        "eye {}/{} reopened after {:?}, outside blink window",
                        key.tracking_id, key.side, closed_duration
                    );
                    return Transition::Reopened { closed_duration };
                }

                state.blink_count = state.blink_count.saturating_add(1);
                Transition::Blinked(BlinkEvent {
                    timestamp: now,
                    eye: key.side,
                    tracking_id: key.tracking_id,
                    blink_count: state.blink_count,
                    closed_duration,
                })
            }
        }
    }

    /// Handles a frame where the detector saw the face but not this eye's
    /// contour. Returns `None` when the eye should be reported open by
    /// default because it has too little history.
    pub fn advance_missing(&self, key: EyeKey, state: &mut EyeState, now: Duration) -> Option<Transition> {
        if state.sample_count <= MISSING_AS_CLOSED_AFTER {
            return None;
        }
        state.current_ear = 0.0;
        Some(self.advance(key, state, false, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::EyeSide;

    fn key() -> EyeKey {
        EyeKey::new(1, EyeSide::Left)
    }

    fn close_then_open(closed_for: Duration) -> Transition {
        let machine = BlinkStateMachine::new();
        let mut state = EyeState::new();
        let start = Duration::from_secs(1);
        assert_eq!(machine.advance(key(), &mut state, false, start), Transition::Closed);
        machine.advance(key(), &mut state, true, start + closed_for)
    }

    #[test]
    fn blink_window_is_exclusive() {
        assert!(close_then_open(Duration::from_millis(40)).blink().is_none());
        assert!(close_then_open(Duration::from_millis(50)).blink().is_none());
        assert!(close_then_open(Duration::from_millis(100)).blink().is_some());
        assert!(close_then_open(Duration::from_millis(400)).blink().is_none());
        assert!(close_then_open(Duration::from_millis(500)).blink().is_none());
    }

    #[test]
    fn valid_blink_reports_count_and_side() {
        let Transition::Blinked(event) = close_then_open(Duration::from_millis(120)) else {
            panic!("expected a blink");
        };
        assert_eq!(event.blink_count, 1);
        assert_eq!(event.eye, EyeSide::Left);
        assert_eq!(event.tracking_id, 1);
        assert_eq!(event.timestamp, Duration::from_millis(1120));
        assert_eq!(event.closed_duration, Duration::from_millis(120));
    }

    #[test]
    fn blink_count_never_decreases() {
        let machine = BlinkStateMachine::new();
        let mut state = EyeState::new();
        let pattern = [
            (false, 0),
            (true, 30),
            (false, 100),
            (true, 200),
            (true, 230),
            (false, 300),
            (false, 400),
            (true, 900),
            (false, 1000),
            (true, 1150),
        ];
        let mut last = 0;
        for (is_open, ms) in pattern {
            machine.advance(key(), &mut state, is_open, Duration::from_millis(ms));
            assert!(state.blink_count() >= last);
            last = state.blink_count();
        }
        assert_eq!(state.blink_count(), 2);
        assert!(!state.was_open() && state.is_open());
    }

    #[test]
    fn missing_contour_is_open_until_calibrated() {
        let machine = BlinkStateMachine::new();
        let mut state = EyeState::new();
        state.sample_count = MISSING_AS_CLOSED_AFTER;
        assert!(machine.advance_missing(key(), &mut state, Duration::ZERO).is_none());
        assert!(state.is_open());

        state.sample_count = MISSING_AS_CLOSED_AFTER + 1;
        assert_eq!(
            machine.advance_missing(key(), &mut state, Duration::from_millis(10)),
            Some(Transition::Closed)
        );
        assert!(!state.is_open());
        assert_eq!(state.last_closed_time(), Some(Duration::from_millis(10)));
    }
}
