use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::DetectorError;
use crate::pipeline::services::detection::FaceDetector;
use crate::pipeline::types::{FaceObservation, FrameSnapshot};

type ScriptedResponse = Result<Vec<FaceObservation>, DetectorError>;

/// Replays pre-recorded detector responses, one per call. Useful for
/// feeding recorded landmark streams and for exercising failure paths.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
    hold: Option<Arc<Semaphore>>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            hold: None,
        }
    }

    /// Each detection waits for a permit on `hold` before answering.
    pub fn with_hold(mut self, hold: Arc<Semaphore>) -> Self {
        self.hold = Some(hold);
        self
    }

    pub fn push_faces(&self, faces: Vec<FaceObservation>) {
        self.push(Ok(faces));
    }

    pub fn push_failure(&self, reason: impl Into<String>) {
        self.push(Err(DetectorError::Backend {
            backend: "scripted",
            reason: reason.into(),
        }));
    }

    fn push(&self, response: ScriptedResponse) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for ScriptedDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceDetector for ScriptedDetector {
    async fn detect(&self, _frame: &FrameSnapshot) -> Result<Vec<FaceObservation>, DetectorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(hold) = &self.hold {
            hold.acquire()
                .await
                .map_err(|_| DetectorError::Unavailable("scripted"))?
                .forget();
        }
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
