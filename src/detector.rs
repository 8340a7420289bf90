// src/detector.rs - Hand landmark detection capability
use crate::config::DetectorKind;
use crate::error::CaptureError;
use crate::landmarks::LandmarkFrame;
use image::DynamicImage;
use tracing::info;

/// Submit a camera frame, get back at most one hand's landmarks.
///
/// Implementations run on a blocking worker thread, so `detect` may take as
/// long as inference needs.
pub trait HandDetector: Send + 'static {
    fn detect(&mut self, frame: &DynamicImage) -> Result<LandmarkFrame, CaptureError>;
}

pub fn create_detector(kind: DetectorKind) -> Result<Box<dyn HandDetector>, CaptureError> {
    match kind {
        DetectorKind::Simulated => Ok(Box::new(SimulatedDetector::new())),
    }
}

/// Scripted stand-in for a landmark model. Ignores the pixels and replays a
/// 12 second loop at 30 Hz: sweep, pinch hold, lost hand, fast sweep, rest.
pub struct SimulatedDetector {
    frame: u64,
}

impl SimulatedDetector {
    const RATE: u64 = 30;
    const CYCLE_FRAMES: u64 = 12 * Self::RATE;

    pub fn new() -> Self {
        info!("using simulated hand detector");
        Self { frame: 0 }
    }

    fn frame_at(phase: f64) -> LandmarkFrame {
        const OPEN: f64 = 0.15;
        const PINCHED: f64 = 0.02;

        match phase {
            p if p < 4.0 => LandmarkFrame::synthetic_hand(0.5 + 0.25 * (p * 1.2).sin(), 0.55, OPEN),
            p if p < 6.0 => LandmarkFrame::synthetic_hand(0.5, 0.5, PINCHED),
            p if p < 7.0 => LandmarkFrame::empty(),
            p if p < 10.0 => LandmarkFrame::synthetic_hand(0.5 - 0.3 * (p * 2.5).sin(), 0.45, OPEN),
            _ => LandmarkFrame::synthetic_hand(0.6, 0.5, OPEN),
        }
    }
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector for SimulatedDetector {
    fn detect(&mut self, _frame: &DynamicImage) -> Result<LandmarkFrame, CaptureError> {
        let phase = (self.frame % Self::CYCLE_FRAMES) as f64 / Self::RATE as f64;
        self.frame += 1;
        Ok(Self::frame_at(phase))
    }
}
