use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Why a frame was not let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Not this frame's turn under the sampling rate.
    Skipped,
    /// An analysis is already in flight.
    Busy,
}

/// Frame sampling plus a single-in-flight guard. Runs on the producer
/// thread and never blocks: busy frames are dropped, never queued.
#[derive(Debug, Default)]
pub struct AdmissionGate {
    frame_counter: AtomicU64,
    in_flight: AtomicBool,
    stats: AdmissionStats,
}

/// Held for the lifetime of one analysis; dropping it reopens the gate.
#[derive(Debug)]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
    frame_number: u64,
}

impl AdmissionPermit {
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

impl AdmissionGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Counts the frame, then admits it if it falls on the sampling grid and
    /// nothing else is in flight.
    pub fn try_admit(
        self: &Arc<Self>,
        frame_skip_count: u64,
    ) -> Result<AdmissionPermit, AdmissionDecision> {
        let skip = frame_skip_count.max(1);
        let frame_number = self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.stats.frames_seen.fetch_add(1, Ordering::Relaxed);

        if frame_number % skip != 0 {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return Err(AdmissionDecision::Skipped);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stats.busy.fetch_add(1, Ordering::Relaxed);
            return Err(AdmissionDecision::Busy);
        }

        self.stats.admitted.fetch_add(1, Ordering::Relaxed);
        Ok(AdmissionPermit {
            gate: Arc::clone(self),
            frame_number,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    /// Restarts the sampling grid. An in-flight analysis keeps its permit.
    pub fn reset(&self) {
        self.frame_counter.store(0, Ordering::Relaxed);
    }

    pub fn record_capture_failure(&self) {
        self.stats.capture_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AdmissionSnapshot {
        self.stats.snapshot()
    }
}

#[derive(Debug, Default)]
pub struct AdmissionStats {
    frames_seen: AtomicU64,
    skipped: AtomicU64,
    busy: AtomicU64,
    admitted: AtomicU64,
    capture_failures: AtomicU64,
}

impl AdmissionStats {
    fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            busy: self.busy.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionSnapshot {
    pub frames_seen: u64,
    pub skipped: u64,
    pub busy: u64,
    pub admitted: u64,
    pub capture_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_exactly_every_nth_frame() {
        for skip in [1u64, 2, 3, 5, 7] {
            let gate = AdmissionGate::new();
            let admitted: Vec<u64> = (0..1000)
                .filter_map(|_| gate.try_admit(skip).ok().map(|permit| permit.frame_number()))
                .collect();
            assert_eq!(admitted.len() as u64, 1000 / skip);
            assert!(admitted.iter().all(|n| n % skip == 0));
            assert_eq!(gate.frame_counter(), 1000);
        }
    }

    #[test]
    fn zero_skip_behaves_like_one() {
        let gate = AdmissionGate::new();
        assert!(gate.try_admit(0).is_ok());
        assert!(gate.try_admit(0).is_ok());
    }

    #[test]
    fn busy_frames_are_dropped_until_permit_released() {
        let gate = AdmissionGate::new();
        let permit = gate.try_admit(1).unwrap();
        assert!(gate.is_busy());
        assert_eq!(gate.try_admit(1).unwrap_err(), AdmissionDecision::Busy);
        assert_eq!(gate.try_admit(1).unwrap_err(), AdmissionDecision::Busy);
        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_admit(1).is_ok());

        let stats = gate.stats();
        assert_eq!(stats.frames_seen, 4);
        assert_eq!(stats.busy, 2);
        assert_eq!(stats.admitted, 2);
    }

    #[test]
    fn reset_restarts_sampling_grid() {
        let gate = AdmissionGate::new();
        assert_eq!(gate.try_admit(3).unwrap_err(), AdmissionDecision::Skipped);
        gate.reset();
        assert_eq!(gate.try_admit(3).unwrap_err(), AdmissionDecision::Skipped);
        assert_eq!(gate.try_admit(3).unwrap_err(), AdmissionDecision::Skipped);
        assert_eq!(gate.try_admit(3).unwrap().frame_number(), 3);
    }
}
