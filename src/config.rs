use std::path::Path;

use serde::Deserialize;
use tracing::{warn, Level};

use crate::error::AppError;

pub const DEFAULT_FRAME_SKIP_COUNT: i64 = 3;
pub const DEFAULT_BLINK_THRESHOLD: f32 = 0.5;

/// Tunables supplied when the pipeline is enabled. Immutable for the
/// lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Admit one frame out of every `frame_skip_count`. Values below 1 are
    /// clamped rather than rejected.
    pub frame_skip_count: i64,
    /// Fraction of an eye's average EAR below which it is considered closed.
    pub blink_threshold: f32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            frame_skip_count: DEFAULT_FRAME_SKIP_COUNT,
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
        }
    }
}

impl Configuration {
    pub fn new(frame_skip_count: i64, blink_threshold: f32) -> Self {
        Self {
            frame_skip_count,
            blink_threshold,
        }
    }

    pub fn effective_frame_skip(&self) -> u64 {
        self.frame_skip_count.max(1) as u64
    }

    pub fn effective_blink_threshold(&self) -> f32 {
        if self.blink_threshold.is_finite() && self.blink_threshold > 0.0 {
            self.blink_threshold
        } else {
            DEFAULT_BLINK_THRESHOLD
        }
    }

    /// Returns a copy with every tunable forced into its safe range.
    pub fn sanitized(self) -> Self {
        if self.frame_skip_count < 1 {
            warn!(
                "frame_skip_count {} is below 1, clamping to 1",
                self.frame_skip_count
            );
        }
        if self.effective_blink_threshold() != self.blink_threshold {
            warn!(
                "blink_threshold {} is not a positive number, using {}",
                self.blink_threshold, DEFAULT_BLINK_THRESHOLD
            );
        }
        Self {
            frame_skip_count: self.effective_frame_skip() as i64,
            blink_threshold: self.effective_blink_threshold(),
        }
    }
}

/// Process-level settings for the binary and the pipeline builder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pipeline: Configuration,
    pub event_buffer_size: usize,
    pub enable_metrics: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pipeline: Configuration::default(),
            event_buffer_size: 64,
            enable_metrics: true,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Layers an optional settings file and `BLINKWATCH__*` environment
    /// variables over the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("BLINKWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    pub fn max_log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn frame_skip_is_clamped_to_one() {
        assert_eq!(Configuration::new(0, 0.5).effective_frame_skip(), 1);
        assert_eq!(Configuration::new(-7, 0.5).effective_frame_skip(), 1);
        assert_eq!(Configuration::new(4, 0.5).effective_frame_skip(), 4);
    }

    #[test]
    fn invalid_blink_threshold_falls_back_to_default() {
        let config = Configuration::new(2, -1.0).sanitized();
        assert_eq!(config.blink_threshold, DEFAULT_BLINK_THRESHOLD);
        let config = Configuration::new(2, f32::NAN).sanitized();
        assert_eq!(config.blink_threshold, DEFAULT_BLINK_THRESHOLD);
        let config = Configuration::new(0, 0.3).sanitized();
        assert_eq!(config, Configuration::new(1, 0.3));
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("blinkwatch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\nevent_buffer_size = 8\n\n[pipeline]\nframe_skip_count = 5\nblink_threshold = 0.35"
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.pipeline.frame_skip_count, 5);
        assert!((settings.pipeline.blink_threshold - 0.35).abs() < 1e-6);
        assert_eq!(settings.event_buffer_size, 8);
        assert!(settings.enable_metrics);
        assert_eq!(settings.max_log_level(), Level::DEBUG);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn defaults_without_file() {
        let settings = Settings::default();
        assert_eq!(settings.pipeline, Configuration::default());
        assert_eq!(settings.max_log_level(), Level::INFO);
    }
}
