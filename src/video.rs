// src/video.rs - Camera frames for the hand detector
use crate::config::{CaptureConfig, SourceKind};
use crate::error::CaptureError;
use image::DynamicImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Lives on the capture thread for its whole life; never shared.
pub enum FrameSource {
    Camera { camera: Camera, mirror: bool },
    Synthetic {
        width: u32,
        height: u32,
        interval: Duration,
        last: Option<Instant>,
    },
}

impl FrameSource {
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        match config.source {
            SourceKind::Camera => Self::open_camera(config),
            SourceKind::Synthetic => {
                info!("using synthetic frame source at {} fps", config.fps);
                Ok(FrameSource::Synthetic {
                    width: config.width,
                    height: config.height,
                    interval: Duration::from_secs_f64(1.0 / config.fps.max(1) as f64),
                    last: None,
                })
            }
        }
    }

    fn open_camera(config: &CaptureConfig) -> Result<Self, CaptureError> {
        debug!("opening camera index {}", config.camera_index);

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(config.camera_index), requested)
            .map_err(|e| CaptureError::CameraUnavailable(e.to_string()))?;

        // Opening the stream is where a denied permission shows up.
        camera
            .open_stream()
            .map_err(|e| CaptureError::CameraUnavailable(e.to_string()))?;

        info!(
            "camera {} streaming at {}x{}",
            config.camera_index,
            camera.resolution().width(),
            camera.resolution().height()
        );
        Ok(FrameSource::Camera {
            camera,
            mirror: config.mirror,
        })
    }

    /// Blocks until the next frame is available.
    pub fn read_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        match self {
            FrameSource::Camera { camera, mirror } => {
                let frame = camera
                    .frame()
                    .map_err(|e| CaptureError::Frame(e.to_string()))?;
                let decoded = frame
                    .decode_image::<RgbFormat>()
                    .map_err(|e| CaptureError::Frame(e.to_string()))?;

                let image = DynamicImage::ImageRgb8(decoded);
                Ok(if *mirror { image.fliph() } else { image })
            }
            FrameSource::Synthetic {
                width,
                height,
                interval,
                last,
            } => {
                if let Some(prev) = *last {
                    let elapsed = prev.elapsed();
                    if elapsed < *interval {
                        std::thread::sleep(*interval - elapsed);
                    }
                }
                *last = Some(Instant::now());
                Ok(DynamicImage::new_rgb8(*width, *height))
            }
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        if let FrameSource::Camera { camera, .. } = self {
            let _ = camera.stop_stream();
            debug!("camera stream stopped");
        }
    }
}

/// Names of the cameras the platform backend can see.
pub fn list_cameras() -> Result<Vec<String>, CaptureError> {
    nokhwa::query(nokhwa::utils::ApiBackend::Auto)
        .map(|cameras| cameras.iter().map(|c| c.human_name()).collect())
        .map_err(|e| CaptureError::CameraUnavailable(e.to_string()))
}
