// src/gesture.rs - Turns landmark frames into zoom steps and rotation commands
use crate::config::{GestureConfig, ZoomConfig};
use crate::control::{GestureState, RotationCommand, SharedControl};
use crate::landmarks::LandmarkFrame;
use std::time::{Duration, Instant};
use tracing::trace;

/// What one call to [`GestureInterpreter::interpret`] decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpretation {
    /// Arrived too soon after the last accepted frame; nothing changed.
    Throttled,
    HandLost,
    Hand {
        is_pinching: bool,
        dx: f64,
        stable: bool,
        command: Option<RotationCommand>,
    },
}

pub struct GestureInterpreter {
    config: GestureConfig,
    zoom: ZoomConfig,
    control: SharedControl,
    min_interval: Duration,
    last_accepted: Option<Instant>,
    last_palm_x: Option<f64>,
}

impl GestureInterpreter {
    pub fn new(config: GestureConfig, zoom: ZoomConfig, control: SharedControl) -> Self {
        let min_interval = Duration::try_from_secs_f64(config.min_interval_ms.max(0.0) / 1000.0)
            .unwrap_or(Duration::MAX);
        Self {
            config,
            zoom,
            control,
            min_interval,
            last_accepted: None,
            last_palm_x: None,
        }
    }

    pub fn interpret(&mut self, frame: &LandmarkFrame, now: Instant) -> Interpretation {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.min_interval {
                return Interpretation::Throttled;
            }
        }
        self.last_accepted = Some(now);

        if !frame.is_present() {
            return self.hand_lost();
        }
        let (Some(distance), Some(palm)) = (frame.pinch_distance(), frame.palm_center()) else {
            return self.hand_lost();
        };
        // A non-finite palm would poison every later dx.
        if !(distance.is_finite() && palm.x.is_finite() && palm.y.is_finite()) {
            return self.hand_lost();
        }

        let is_pinching = distance < self.config.pinch_threshold;

        let dx = self.last_palm_x.map_or(0.0, |last| palm.x - last);
        self.last_palm_x = Some(palm.x);

        let stable = dx.abs() < self.config.jitter_threshold;

        // Pinching leaves any velocity alone so the globe coasts.
        let command = match (is_pinching, stable) {
            (false, false) => Some(RotationCommand::Impulse {
                y: dx * self.config.rotation_sensitivity,
            }),
            (false, true) => Some(RotationCommand::Stop),
            (true, _) => None,
        };

        let zoom_delta = if is_pinching {
            -self.config.zoom_out_step
        } else {
            self.config.zoom_in_step
        };

        self.control.update(|state| {
            state.gesture = GestureState {
                hand_present: true,
                palm_x: palm.x,
                palm_y: palm.y,
                is_pinching,
            };
            state.step_zoom(zoom_delta, &self.zoom);
            if let Some(command) = command {
                state.post_rotation(command);
            }
        });

        trace!(dx, is_pinching, stable, ?command, "hand frame");

        Interpretation::Hand {
            is_pinching,
            dx,
            stable,
            command,
        }
    }

    fn hand_lost(&mut self) -> Interpretation {
        self.last_palm_x = None;
        self.control.update(|state| {
            state.gesture.hand_present = false;
            state.gesture.is_pinching = false;
        });
        trace!("hand lost");
        Interpretation::HandLost
    }
}
