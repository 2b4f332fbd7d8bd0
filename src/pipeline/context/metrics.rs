use std::time::Duration;

/// Metrics collected during frame processing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameMetrics {
    detection_duration: Option<Duration>,
    analysis_duration: Option<Duration>,
    total_duration: Option<Duration>,
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detection_duration(&mut self, duration: Duration) {
        self.detection_duration = Some(duration);
    }

    /// Closes the frame: everything after detection counts as analysis.
    pub fn finalize(&mut self, total: Duration) {
        let detection = self.detection_duration.unwrap_or_default();
        self.analysis_duration = Some(total.saturating_sub(detection));
        self.total_duration = Some(total);
    }

    pub fn detection_duration(&self) -> Option<Duration> {
        self.detection_duration
    }

    pub fn analysis_duration(&self) -> Option<Duration> {
        self.analysis_duration
    }

    pub fn total_duration(&self) -> Option<Duration> {
        self.total_duration
    }
}
