// src/config.rs - Tuned constants for the gesture and motion pipeline
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Anything slower than one accepted frame a minute is a broken config.
const MAX_GESTURE_INTERVAL_MS: f64 = 60_000.0;

/// Gesture interpreter thresholds. All distances are in normalized image units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum spacing between accepted landmark frames (30 Hz).
    pub min_interval_ms: f64,
    pub pinch_threshold: f64,
    pub jitter_threshold: f64,
    /// Palm displacement to angular velocity gain.
    pub rotation_sensitivity: f64,
    pub zoom_out_step: f64,
    pub zoom_in_step: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000.0 / 30.0,
            pinch_threshold: 0.05,
            jitter_threshold: 0.003,
            rotation_sensitivity: 0.4,
            zoom_out_step: 0.03,
            zoom_in_step: 0.015,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    pub initial: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.4,
            max: 1.2,
            initial: 1.0,
        }
    }
}

impl ZoomConfig {
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

/// Per display frame physics. Values are per tick, not per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub damping: f64,
    /// Auto-drift added to the y velocity while the globe is empty.
    pub idle_drift: f64,
    /// Auto-drift once at least one image is loaded.
    pub content_drift: f64,
    pub smoothing: f64,
    pub initial_velocity: [f64; 2],
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            damping: 0.92,
            idle_drift: 0.0005,
            content_drift: 0.0002,
            smoothing: 0.1,
            initial_velocity: [0.0, 0.005],
        }
    }
}

impl MotionConfig {
    pub fn drift_for(&self, image_count: usize) -> f64 {
        if image_count == 0 {
            self.idle_drift
        } else {
            self.content_drift
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Camera,
    /// Blank frames at the configured rate; pairs with the simulated detector.
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: SourceKind,
    pub detector: DetectorKind,
    pub camera_index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
    /// Consecutive failed reads before the camera is reported unavailable.
    pub max_frame_failures: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Camera,
            detector: DetectorKind::Simulated,
            camera_index: 0,
            width: 640,
            height: 480,
            fps: 30,
            mirror: true,
            max_frame_failures: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_files: usize,
    pub max_file_bytes: u64,
    pub max_edge: u32,
    pub panel_radius: f32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: 50,
            max_file_bytes: 5 * 1024 * 1024,
            max_edge: 512,
            panel_radius: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub capacity: usize,
    pub output_directory: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: 3600,
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("GestureGlobe")))
                .unwrap_or_else(|| PathBuf::from("./output")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub gesture: GestureConfig,
    pub zoom: ZoomConfig,
    pub motion: MotionConfig,
    pub capture: CaptureConfig,
    pub upload: UploadConfig,
    pub trace: TraceConfig,
}

impl GlobeConfig {
    /// `<config dir>/gesture_globe/config.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "gestureglobe", "gesture_globe")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads the user config, falling back to defaults when it is missing or broken.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.motion;
        if !(m.damping > 0.0 && m.damping < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "damping must be in (0, 1), got {}",
                m.damping
            )));
        }
        if !(m.smoothing > 0.0 && m.smoothing <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "smoothing must be in (0, 1], got {}",
                m.smoothing
            )));
        }
        let z = &self.zoom;
        if !(z.min > 0.0 && z.min <= z.max) {
            return Err(ConfigError::Invalid(format!(
                "zoom range [{}, {}] is empty or non-positive",
                z.min, z.max
            )));
        }
        if !(z.min..=z.max).contains(&z.initial) {
            return Err(ConfigError::Invalid(format!(
                "initial zoom {} outside [{}, {}]",
                z.initial, z.min, z.max
            )));
        }
        let g = &self.gesture;
        if !(g.min_interval_ms.is_finite() && g.min_interval_ms <= MAX_GESTURE_INTERVAL_MS) {
            return Err(ConfigError::Invalid(format!(
                "gesture interval must be at most {MAX_GESTURE_INTERVAL_MS} ms, got {}",
                g.min_interval_ms
            )));
        }
        if g.min_interval_ms < 0.0 || g.pinch_threshold <= 0.0 || g.jitter_threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "gesture thresholds must be non-negative".to_string(),
            ));
        }
        if g.zoom_in_step < 0.0 || g.zoom_out_step < 0.0 {
            return Err(ConfigError::Invalid("zoom steps must be non-negative".to_string()));
        }
        if self.capture.fps == 0 {
            return Err(ConfigError::Invalid("capture fps must be positive".to_string()));
        }
        if self.upload.max_edge == 0 {
            return Err(ConfigError::Invalid("upload max_edge must be positive".to_string()));
        }
        Ok(())
    }
}
