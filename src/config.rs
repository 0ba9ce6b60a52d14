//! Engine configuration.
//!
//! All policy constants live in one serde struct. Missing fields in a
//! config file fall back to the defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompositionError, Result};
use crate::timeline::duration::{MIN_TOTAL_DURATION, TAIL_PAD_SECONDS};
use crate::timeline::snapping::{DEFAULT_SNAP_PIXEL_TOLERANCE, DEFAULT_SNAP_THRESHOLD};

/// Shortest span a gesture may leave a clip with, in seconds.
pub const DEFAULT_MIN_CLIP_DURATION: f64 = 0.5;

/// Duration of a placement dropped from the library, in seconds.
pub const DEFAULT_PLACEMENT_DURATION: f64 = 5.0;

/// Playback tick interval (~30 steps per second).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 33;

/// Frame rate used for frame stepping.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Default maximum number of history entries to keep.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Viewport width assumed until the UI reports one.
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1000.0;

/// Policy knobs for the composition engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum clip duration enforced by gestures and edits (seconds)
    pub min_clip_duration: f64,
    /// Snap threshold in the time domain (seconds)
    pub snap_threshold_seconds: f64,
    /// Pixel radius the UI converts into `snap_threshold_seconds`
    pub snap_pixel_tolerance: f64,
    /// Whether gestures snap at all
    pub snap_enabled: bool,
    /// Shortest possible timeline (seconds)
    pub duration_floor_seconds: f64,
    /// Empty space kept after the last clip (seconds)
    pub duration_tail_pad_seconds: f64,
    /// Duration given to placements dropped from the library (seconds)
    pub default_placement_duration: f64,
    /// Playback tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// Frames per second for frame stepping
    pub frame_rate: f64,
    /// Maximum number of history entries
    pub max_history: usize,
    /// Viewport width used for pixel conversions until set by the UI
    pub default_viewport_width: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_clip_duration: DEFAULT_MIN_CLIP_DURATION,
            snap_threshold_seconds: DEFAULT_SNAP_THRESHOLD,
            snap_pixel_tolerance: DEFAULT_SNAP_PIXEL_TOLERANCE,
            snap_enabled: true,
            duration_floor_seconds: MIN_TOTAL_DURATION,
            duration_tail_pad_seconds: TAIL_PAD_SECONDS,
            default_placement_duration: DEFAULT_PLACEMENT_DURATION,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            frame_rate: DEFAULT_FRAME_RATE,
            max_history: DEFAULT_MAX_HISTORY,
            default_viewport_width: DEFAULT_VIEWPORT_WIDTH,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CompositionError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Seconds advanced by one playback tick.
    pub fn tick_seconds(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }

    /// Seconds per frame for frame stepping.
    pub fn frame_seconds(&self) -> f64 {
        1.0 / self.frame_rate
    }

    /// Reject values that would break the engine's invariants.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("min_clip_duration", self.min_clip_duration),
            ("duration_floor_seconds", self.duration_floor_seconds),
            ("default_placement_duration", self.default_placement_duration),
            ("frame_rate", self.frame_rate),
            ("default_viewport_width", self.default_viewport_width),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CompositionError::InvalidConfig {
                    reason: format!("{} must be positive, got {}", name, value),
                });
            }
        }
        let non_negative = [
            ("snap_threshold_seconds", self.snap_threshold_seconds),
            ("snap_pixel_tolerance", self.snap_pixel_tolerance),
            ("duration_tail_pad_seconds", self.duration_tail_pad_seconds),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CompositionError::InvalidConfig {
                    reason: format!("{} must not be negative, got {}", name, value),
                });
            }
        }
        if self.tick_interval_ms == 0 {
            return Err(CompositionError::InvalidConfig {
                reason: "tick_interval_ms must be at least 1".to_string(),
            });
        }
        if self.max_history == 0 {
            return Err(CompositionError::InvalidConfig {
                reason: "max_history must be at least 1".to_string(),
            });
        }
        if self.default_placement_duration < self.min_clip_duration {
            return Err(CompositionError::InvalidConfig {
                reason: "default_placement_duration is below min_clip_duration".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_clip_duration, 0.5);
        assert_eq!(config.snap_threshold_seconds, 0.5);
        assert!((config.tick_seconds() - 0.033).abs() < 1e-12);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "snap_threshold_seconds": 0.25, "max_history": 5 }}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.snap_threshold_seconds, 0.25);
        assert_eq!(config.max_history, 5);
        assert_eq!(config.min_clip_duration, DEFAULT_MIN_CLIP_DURATION);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = EngineConfig {
            min_clip_duration: 0.0,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let config = EngineConfig {
            max_history: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/montage.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_READ_ERROR");
    }
}
