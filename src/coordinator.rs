use crate::{
    config::{Configuration, Settings},
    error::LifecycleError,
    pipeline::{
        context::{AdmittedState, DetectedState, FrameContext},
        services::{
            admission::{AdmissionDecision, AdmissionGate, AdmissionSnapshot},
            detection::{BoxedDetectionService, DetectionService, FaceDetector},
            frame_publish::{PipelineEvent, ResultPublisher},
            orchestration::{
                FailureStage, MetricsCollector, PerformanceMonitor, PerformanceStats,
                PipelineCoordinator, SlowFrameTracker,
            },
        },
        types::{FrameSnapshot, SourceKind, VideoFrame},
    },
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, info, instrument, warn};

/// What happened to a frame handed to [`BlinkPipeline::on_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// No session is active.
    Disabled,
    /// Not on the sampling grid.
    Skipped,
    /// An analysis is already in flight.
    Busy,
    /// Copied out and queued for the worker.
    Submitted,
    /// Admitted but lost to a capture failure or a concurrent lifecycle change.
    Dropped,
}

struct Session {
    configuration: Configuration,
    job_tx: mpsc::Sender<FrameContext<AdmittedState>>,
    cancel_token: CancellationToken,
    worker: JoinHandle<()>,
}

impl Session {
    fn stop(self) {
        self.cancel_token.cancel();
        // The worker finishes its current frame on its own and discards it.
        drop(self.job_tx);
        drop(self.worker);
    }
}

/// Long-lived blink detection pipeline owned by the control layer.
///
/// Frames enter through [`on_frame`](Self::on_frame) on the producer's
/// thread, admitted frames are analyzed on a tokio worker task, and results
/// fan out through [`subscribe`](Self::subscribe).
pub struct BlinkPipeline {
    gate: Arc<AdmissionGate>,
    coordinator: Arc<Mutex<PipelineCoordinator>>,
    detector: Arc<dyn FaceDetector>,
    publisher: ResultPublisher,
    session: Mutex<Option<Session>>,
    administratively_enabled: AtomicBool,
    monitor: Option<PerformanceMonitor>,
    slow_frame_budget: Duration,
}

impl BlinkPipeline {
    pub fn builder(detector: Arc<dyn FaceDetector>) -> BlinkPipelineBuilder {
        BlinkPipelineBuilder::new(detector)
    }

    /// Starts a session. Must be called from within a tokio runtime.
    pub fn enable(
        &self,
        source: SourceKind,
        configuration: Configuration,
    ) -> Result<(), LifecycleError> {
        if !self.administratively_enabled.load(Ordering::Acquire) {
            return Err(LifecycleError::AdministrativelyDisabled);
        }
        if source != SourceKind::Video {
            return Err(LifecycleError::NonVideoSource(source.to_string()));
        }

        let mut session = self.lock_session();
        if session.is_some() {
            return Err(LifecycleError::AlreadyEnabled);
        }
        let runtime = Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;

        let configuration = configuration.sanitized();
        self.lock_coordinator().configure(&configuration);

        let (job_tx, job_rx) = mpsc::channel(1);
        let cancel_token = CancellationToken::new();
        let worker = AnalysisWorker {
            service: DetectionService::boxed(Arc::clone(&self.detector)),
            coordinator: Arc::clone(&self.coordinator),
            publisher: self.publisher.clone(),
            metrics: self.metrics_collector(),
            cancel_token: cancel_token.clone(),
        };

        *session = Some(Session {
            configuration,
            job_tx,
            cancel_token,
            worker: runtime.spawn(worker.run(job_rx)),
        });
        info!(
            "Blink pipeline enabled with {} detector (frame_skip_count={}, blink_threshold={})",
            self.detector.name(),
            configuration.frame_skip_count,
            configuration.blink_threshold
        );
        Ok(())
    }

    /// Stops the session and forgets all per-eye state. Returns whether a
    /// session was active. No result is published after this returns.
    pub fn disable(&self) -> bool {
        let Some(session) = self.lock_session().take() else {
            debug!("disable called with no active session");
            return false;
        };
        session.cancel_token.cancel();

        // Waits out a publication already holding the lock; later ones see
        // the cancelled token.
        let mut coordinator = self.lock_coordinator();
        coordinator.reset();
        self.gate.reset();
        drop(coordinator);

        session.stop();
        info!("Blink pipeline disabled");
        true
    }

    /// Clears calibration, blink counts and the sampling grid without ending
    /// the session.
    pub fn reset(&self) {
        let mut coordinator = self.lock_coordinator();
        coordinator.reset();
        self.gate.reset();
        info!("Blink pipeline state reset");
    }

    /// Frame-delivery entry point. Never blocks and never fails; the buffer
    /// is copied out before this returns when the frame is admitted.
    pub fn on_frame(&self, frame: &VideoFrame<'_>) -> FrameDisposition {
        let session = match self.session.try_lock() {
            Ok(session) => session,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("Lifecycle change in progress, dropping frame");
                return FrameDisposition::Dropped;
            }
        };
        let Some(session) = session.as_ref() else {
            return FrameDisposition::Disabled;
        };

        let permit = match self
            .gate
            .try_admit(session.configuration.effective_frame_skip())
        {
            Ok(permit) => permit,
            Err(AdmissionDecision::Skipped) => return FrameDisposition::Skipped,
            Err(AdmissionDecision::Busy) => return FrameDisposition::Busy,
        };

        let snapshot = match FrameSnapshot::capture(frame) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!("Failed to capture frame {}: {}", permit.frame_number(), error);
                self.gate.record_capture_failure();
                return FrameDisposition::Dropped;
            }
        };

        match session.job_tx.try_send(FrameContext::new(snapshot, permit)) {
            Ok(()) => FrameDisposition::Submitted,
            Err(error) => {
                debug!("Analysis worker not accepting frames: {}", error);
                FrameDisposition::Dropped
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.publisher.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.lock_session().is_some()
    }

    pub fn set_administratively_enabled(&self, enabled: bool) {
        self.administratively_enabled.store(enabled, Ordering::Release);
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.lock_session()
            .as_ref()
            .map(|session| session.configuration)
    }

    pub fn admission_stats(&self) -> AdmissionSnapshot {
        self.gate.stats()
    }

    pub fn performance_stats(&self) -> Option<PerformanceStats> {
        self.monitor.as_ref().map(PerformanceMonitor::get_stats)
    }

    fn metrics_collector(&self) -> MetricsCollector {
        match &self.monitor {
            Some(monitor) => MetricsCollector::new()
                .add_observer(Box::new(monitor.clone()))
                .add_observer(Box::new(SlowFrameTracker::new(self.slow_frame_budget))),
            None => MetricsCollector::new(),
        }
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_coordinator(&self) -> std::sync::MutexGuard<'_, PipelineCoordinator> {
        self.coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BlinkPipeline {
    fn drop(&mut self) {
        if let Some(session) = self.lock_session().take() {
            session.stop();
        }
    }
}

struct AnalysisWorker {
    service: BoxedDetectionService,
    coordinator: Arc<Mutex<PipelineCoordinator>>,
    publisher: ResultPublisher,
    metrics: MetricsCollector,
    cancel_token: CancellationToken,
}

impl AnalysisWorker {
    async fn run(mut self, mut job_rx: mpsc::Receiver<FrameContext<AdmittedState>>) {
        let cancel_token = self.cancel_token.clone();
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                job = job_rx.recv() => match job {
                    Some(context) => self.process(context).await,
                    None => break,
                },
            }
        }
        debug!("Analysis worker stopped");
    }

    #[instrument(skip(self, context), fields(frame = context.frame_number()))]
    async fn process(&mut self, context: FrameContext<AdmittedState>) {
        let detected = match self.service.ready().await {
            Ok(service) => service.call(context).await,
            Err(error) => Err(error),
        };

        match detected {
            Ok(detected) => self.publish(detected),
            Err(error) => {
                warn!("Dropping frame after detection failure: {}", error);
                self.metrics
                    .notify_transient_failure(FailureStage::Detection);
            }
        }
    }

    fn publish(&mut self, mut detected: FrameContext<DetectedState>) {
        let mut coordinator = self
            .coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.cancel_token.is_cancelled() {
            debug!("Session ended during analysis, discarding result");
            self.metrics.notify_result_discarded();
            return;
        }

        let outcome = coordinator.analyze(&detected);
        detected.record_analysis_complete();
        self.metrics
            .notify_frame_analyzed(detected.metrics(), outcome.result.faces.len());
        for blink in &outcome.blinks {
            self.metrics.notify_blink(blink);
        }
        // Reopen the gate before subscribers can react to the result.
        drop(detected);
        self.publisher.publish_frame(outcome.result, outcome.blinks);
    }
}

pub struct BlinkPipelineBuilder {
    detector: Arc<dyn FaceDetector>,
    defaults: Configuration,
    event_buffer_size: usize,
    enable_metrics: bool,
    administratively_enabled: bool,
    slow_frame_budget: Duration,
}

impl BlinkPipelineBuilder {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        let settings = Settings::default();
        Self {
            detector,
            defaults: settings.pipeline,
            event_buffer_size: settings.event_buffer_size,
            enable_metrics: settings.enable_metrics,
            administratively_enabled: true,
            slow_frame_budget: Duration::from_millis(100),
        }
    }

    // Applies process-level settings, this will override the builder defaults.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.defaults = settings.pipeline;
        self.event_buffer_size = settings.event_buffer_size;
        self.enable_metrics = settings.enable_metrics;
        self
    }

    // Capacity of the result broadcast channel per subscriber.
    pub fn event_buffer_size(mut self, event_buffer_size: usize) -> Self {
        self.event_buffer_size = event_buffer_size;
        self
    }

    pub fn enable_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    pub fn administratively_enabled(mut self, enabled: bool) -> Self {
        self.administratively_enabled = enabled;
        self
    }

    // Analysis taking longer than this is logged as slow.
    pub fn slow_frame_budget(mut self, budget: Duration) -> Self {
        self.slow_frame_budget = budget;
        self
    }

    pub fn build(self) -> BlinkPipeline {
        let (publisher, _) = ResultPublisher::new(self.event_buffer_size);
        BlinkPipeline {
            gate: AdmissionGate::new(),
            coordinator: Arc::new(Mutex::new(PipelineCoordinator::new(&self.defaults))),
            detector: self.detector,
            publisher,
            session: Mutex::new(None),
            administratively_enabled: AtomicBool::new(self.administratively_enabled),
            monitor: self.enable_metrics.then(PerformanceMonitor::new),
            slow_frame_budget: self.slow_frame_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::services::detection::ScriptedDetector;
    use crate::pipeline::types::PixelBuffer;
    use tokio::sync::Semaphore;

    const PIXELS: [u8; 12] = [0; 12];

    fn frame(ms: u64) -> VideoFrame<'static> {
        VideoFrame::new(
            2,
            2,
            Duration::from_millis(ms),
            PixelBuffer::Rgb8 {
                data: &PIXELS,
                stride: 6,
            },
        )
    }

    fn pipeline(detector: ScriptedDetector) -> BlinkPipeline {
        BlinkPipeline::builder(Arc::new(detector)).build()
    }

    #[test]
    fn enable_outside_runtime_fails() {
        let pipeline = pipeline(ScriptedDetector::new());
        assert_eq!(
            pipeline.enable(SourceKind::Video, Configuration::default()),
            Err(LifecycleError::NoRuntime)
        );
        assert!(!pipeline.is_enabled());
    }

    #[test]
    fn frames_are_ignored_while_disabled() {
        let pipeline = pipeline(ScriptedDetector::new());
        assert_eq!(pipeline.on_frame(&frame(0)), FrameDisposition::Disabled);
        assert_eq!(pipeline.admission_stats().frames_seen, 0);
        assert!(!pipeline.disable());
    }

    #[tokio::test]
    async fn lifecycle_misuse_is_reported() {
        let pipeline = pipeline(ScriptedDetector::new());
        assert_eq!(
            pipeline.enable(SourceKind::Audio, Configuration::default()),
            Err(LifecycleError::NonVideoSource("audio".to_string()))
        );

        pipeline.enable(SourceKind::Video, Configuration::default()).unwrap();
        assert_eq!(
            pipeline.enable(SourceKind::Video, Configuration::default()),
            Err(LifecycleError::AlreadyEnabled)
        );
        assert!(pipeline.disable());
        assert!(!pipeline.disable());

        pipeline.set_administratively_enabled(false);
        assert_eq!(
            pipeline.enable(SourceKind::Video, Configuration::default()),
            Err(LifecycleError::AdministrativelyDisabled)
        );
    }

    #[tokio::test]
    async fn session_configuration_is_sanitized() {
        let pipeline = pipeline(ScriptedDetector::new());
        pipeline
            .enable(SourceKind::Video, Configuration::new(0, f32::NAN))
            .unwrap();
        assert_eq!(pipeline.configuration(), Some(Configuration::new(1, 0.5)));
    }

    #[tokio::test]
    async fn frames_while_busy_are_dropped_not_queued() {
        let hold = Arc::new(Semaphore::new(0));
        let detector = ScriptedDetector::new().with_hold(Arc::clone(&hold));
        let pipeline = pipeline(detector);
        pipeline
            .enable(SourceKind::Video, Configuration::new(2, 0.5))
            .unwrap();

        let dispositions: Vec<_> = (0..4).map(|k| pipeline.on_frame(&frame(k * 33))).collect();
        assert_eq!(
            dispositions,
            vec![
                FrameDisposition::Skipped,
                FrameDisposition::Submitted,
                FrameDisposition::Skipped,
                FrameDisposition::Busy,
            ]
        );
        let stats = pipeline.admission_stats();
        assert_eq!((stats.frames_seen, stats.admitted, stats.busy), (4, 1, 1));
        hold.close();
    }

    #[tokio::test]
    async fn capture_failure_releases_the_gate() {
        let pipeline = pipeline(ScriptedDetector::new());
        pipeline
            .enable(SourceKind::Video, Configuration::new(1, 0.5))
            .unwrap();

        let short = [0u8; 3];
        let broken = VideoFrame::new(
            2,
            2,
            Duration::ZERO,
            PixelBuffer::Rgb8 {
                data: &short,
                stride: 6,
            },
        );
        assert_eq!(pipeline.on_frame(&broken), FrameDisposition::Dropped);
        assert_eq!(pipeline.admission_stats().capture_failures, 1);
        assert!(!pipeline.gate.is_busy());
    }

    #[tokio::test]
    async fn detection_failures_are_counted() {
        let detector = ScriptedDetector::new();
        detector.push_failure("backend crashed");
        let pipeline = pipeline(detector);
        let mut events = pipeline.subscribe();
        pipeline
            .enable(SourceKind::Video, Configuration::new(1, 0.5))
            .unwrap();

        assert_eq!(pipeline.on_frame(&frame(0)), FrameDisposition::Submitted);
        while pipeline.performance_stats().unwrap().detection_failures == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!pipeline.gate.is_busy());
        assert!(events.try_recv().is_err());

        assert_eq!(pipeline.on_frame(&frame(33)), FrameDisposition::Submitted);
        let event = events.recv().await.unwrap();
        assert_eq!(event.name(), "faceDetected");
    }
}
