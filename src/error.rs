// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the camera / hand detector capability.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("failed to capture frame: {0}")]
    Frame(String),

    #[error("hand detector failed to initialize: {0}")]
    DetectorInit(String),

    #[error("hand detection failed: {0}")]
    Detection(String),
}

/// Reasons a single upload candidate is rejected or fails to load.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
