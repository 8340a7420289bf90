// src/data.rs - Per-tick motion trace for tuning the pipeline constants
use crate::control::ControlState;
use crate::motion::SmoothedRenderState;
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSample {
    pub frame: u64,
    pub timestamp_ms: f64,
    pub hand_present: bool,
    pub is_pinching: bool,
    pub palm_x: f64,
    pub palm_y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub zoom_target: f64,
    pub display_rotation_x: f64,
    pub display_rotation_y: f64,
    pub display_zoom: f64,
    pub image_count: usize,
}

/// Bounded ring of the most recent display ticks.
pub struct MotionTrace {
    capacity: usize,
    samples: VecDeque<TraceSample>,
    started: Instant,
    frame: u64,
    session_name: String,
}

impl MotionTrace {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.min(4096)),
            started: Instant::now(),
            frame: 0,
            session_name: format!("trace_{}", Local::now().format("%Y%m%d_%H%M%S")),
        }
    }

    pub fn record(&mut self, state: &ControlState, render: &SmoothedRenderState) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(TraceSample {
            frame: self.frame,
            timestamp_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            hand_present: state.gesture.hand_present,
            is_pinching: state.gesture.is_pinching,
            palm_x: state.gesture.palm_x,
            palm_y: state.gesture.palm_y,
            velocity_x: state.velocity.x,
            velocity_y: state.velocity.y,
            rotation_x: state.rotation.x,
            rotation_y: state.rotation.y,
            zoom_target: state.zoom_target,
            display_rotation_x: render.display_rotation.x,
            display_rotation_y: render.display_rotation.y,
            display_zoom: render.display_zoom,
            image_count: state.image_count,
        });
        self.frame += 1;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &TraceSample> {
        self.samples.iter()
    }

    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::from_writer(out);
        for sample in &self.samples {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes `<output_dir>/<session>/motion_trace.csv`.
    pub fn export_csv(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let csv_path = output_dir
            .as_ref()
            .join(&self.session_name)
            .join("motion_trace.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = File::create(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        self.write_csv(file)?;
        Ok(csv_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MotionConfig, ZoomConfig};
    use nalgebra::Vector2;

    fn render() -> SmoothedRenderState {
        SmoothedRenderState {
            display_rotation: Vector2::new(0.1, 0.2),
            display_zoom: 0.9,
        }
    }

    #[test]
    fn ring_keeps_most_recent_samples() {
        let state = ControlState::new(&MotionConfig::default(), &ZoomConfig::default());
        let mut trace = MotionTrace::new(3);
        for _ in 0..5 {
            trace.record(&state, &render());
        }
        assert_eq!(trace.len(), 3);
        let frames: Vec<u64> = trace.samples().map(|s| s.frame).collect();
        assert_eq!(frames, vec![2, 3, 4]);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut state = ControlState::new(&MotionConfig::default(), &ZoomConfig::default());
        state.gesture.hand_present = true;
        let mut trace = MotionTrace::new(10);
        trace.record(&state, &render());
        trace.record(&state, &render());

        let mut buf = Vec::new();
        trace.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("frame,timestamp_ms,hand_present"));
        assert!(header.ends_with("display_zoom,image_count"));
        assert_eq!(lines.count(), 2);
        assert!(text.contains(",true,false,"));
    }

    #[test]
    fn export_creates_session_directory() {
        let dir = std::env::temp_dir().join(format!("gesture_globe_trace_{}", uuid::Uuid::new_v4()));
        let state = ControlState::new(&MotionConfig::default(), &ZoomConfig::default());
        let mut trace = MotionTrace::new(4);
        trace.record(&state, &render());

        let path = trace.export_csv(&dir).unwrap();
        assert!(path.exists());
        assert!(path.ends_with("motion_trace.csv"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
