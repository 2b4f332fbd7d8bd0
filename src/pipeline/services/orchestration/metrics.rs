use crate::pipeline::context::FrameMetrics;
use crate::pipeline::types::BlinkEvent;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::warn;

/// Where a transient per-frame failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Detection,
}

/// Observer pattern for metrics collection
pub trait MetricsObserver: Send + Sync {
    fn on_frame_analyzed(&mut self, metrics: &FrameMetrics, faces: usize);
    fn on_blink(&mut self, event: &BlinkEvent);
    fn on_transient_failure(&mut self, stage: FailureStage);
    fn on_result_discarded(&mut self);
}

/// Collects and manages multiple metrics observers
#[derive(Default)]
pub struct MetricsCollector {
    observers: Vec<Box<dyn MetricsObserver>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(mut self, observer: Box<dyn MetricsObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn notify_frame_analyzed(&mut self, metrics: &FrameMetrics, faces: usize) {
        for observer in &mut self.observers {
            observer.on_frame_analyzed(metrics, faces);
        }
    }

    pub fn notify_blink(&mut self, event: &BlinkEvent) {
        for observer in &mut self.observers {
            observer.on_blink(event);
        }
    }

    pub fn notify_transient_failure(&mut self, stage: FailureStage) {
        for observer in &mut self.observers {
            observer.on_transient_failure(stage);
        }
    }

    pub fn notify_result_discarded(&mut self) {
        for observer in &mut self.observers {
            observer.on_result_discarded();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceStats {
    pub frames_analyzed: u64,
    pub faces_seen: u64,
    pub blinks_detected: u64,
    pub detection_failures: u64,
    pub results_discarded: u64,

    // EWMA timing stats
    pub avg_detection_us: f32,
    pub avg_analysis_us: f32,
    pub max_total_us: u64,
}

/// Performance monitoring observer
#[derive(Clone, Default)]
pub struct PerformanceMonitor {
    stats: Arc<Mutex<PerformanceStats>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_stats(&self) -> PerformanceStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_ewma(current: f32, new_value: u64, alpha: f32) -> f32 {
        current * (1.0 - alpha) + new_value as f32 * alpha
    }

    fn with_stats(&self, f: impl FnOnce(&mut PerformanceStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }
}

impl MetricsObserver for PerformanceMonitor {
    fn on_frame_analyzed(&mut self, metrics: &FrameMetrics, faces: usize) {
        const ALPHA: f32 = 0.1; // EWMA smoothing factor
        let as_us = |d: Option<Duration>| d.unwrap_or_default().as_micros() as u64;
        self.with_stats(|stats| {
            stats.frames_analyzed += 1;
            stats.faces_seen += faces as u64;
            stats.avg_detection_us =
                Self::update_ewma(stats.avg_detection_us, as_us(metrics.detection_duration()), ALPHA);
            stats.avg_analysis_us =
                Self::update_ewma(stats.avg_analysis_us, as_us(metrics.analysis_duration()), ALPHA);
            stats.max_total_us = stats.max_total_us.max(as_us(metrics.total_duration()));
        });
    }

    fn on_blink(&mut self, _event: &BlinkEvent) {
        self.with_stats(|stats| stats.blinks_detected += 1);
    }

    fn on_transient_failure(&mut self, stage: FailureStage) {
        self.with_stats(|stats| match stage {
            FailureStage::Detection => stats.detection_failures += 1,
        });
    }

    fn on_result_discarded(&mut self) {
        self.with_stats(|stats| stats.results_discarded += 1);
    }
}

/// Warns when a frame takes longer than the budget to analyze.
pub struct SlowFrameTracker {
    budget: Duration,
}

impl SlowFrameTracker {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

impl MetricsObserver for SlowFrameTracker {
    fn on_frame_analyzed(&mut self, metrics: &FrameMetrics, faces: usize) {
        if let Some(total) = metrics.total_duration() {
            if total > self.budget {
                warn!(
                    "Slow frame analysis: {:?} for {} face(s), budget {:?}",
                    total, faces, self.budget
                );
            }
        }
    }

    fn on_blink(&mut self, _event: &BlinkEvent) {}

    fn on_transient_failure(&mut self, _stage: FailureStage) {}

    fn on_result_discarded(&mut self) {}
}
