pub mod metrics;
pub mod pipeline_coordinator;

pub use metrics::{
    FailureStage, MetricsCollector, MetricsObserver, PerformanceMonitor, PerformanceStats,
    SlowFrameTracker,
};
pub use pipeline_coordinator::{AnalysisOutcome, PipelineCoordinator};
