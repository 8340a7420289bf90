// src/control.rs - State shared between the inference and render cadences
use crate::config::{MotionConfig, ZoomConfig};
use nalgebra::Vector2;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What the interpreter last saw. Read by the UI indicators only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureState {
    pub hand_present: bool,
    pub palm_x: f64,
    pub palm_y: f64,
    pub is_pinching: bool,
}

/// Latest rotation request from the interpreter, applied by the integrator
/// after damping on its next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationCommand {
    /// Overwrite the y velocity; x is left as is.
    Impulse { y: f64 },
    /// Hard stop on both axes.
    Stop,
}

/// Field ownership:
/// - `gesture`, `zoom_target`, pending command: written by the gesture interpreter
/// - `velocity`, `rotation`: written by the motion integrator
/// - `image_count`: written by the gallery
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub gesture: GestureState,
    pub velocity: Vector2<f64>,
    pub rotation: Vector2<f64>,
    pub zoom_target: f64,
    pub image_count: usize,
    pending: Option<RotationCommand>,
}

impl ControlState {
    pub fn new(motion: &MotionConfig, zoom: &ZoomConfig) -> Self {
        Self {
            gesture: GestureState::default(),
            velocity: Vector2::new(motion.initial_velocity[0], motion.initial_velocity[1]),
            rotation: Vector2::zeros(),
            zoom_target: zoom.clamp(zoom.initial),
            image_count: 0,
            pending: None,
        }
    }

    /// Replaces any command not yet consumed; only the latest one matters.
    pub fn post_rotation(&mut self, command: RotationCommand) {
        self.pending = Some(command);
    }

    pub fn pending_rotation(&self) -> Option<RotationCommand> {
        self.pending
    }

    pub fn take_rotation(&mut self) -> Option<RotationCommand> {
        self.pending.take()
    }

    pub fn step_zoom(&mut self, delta: f64, bounds: &ZoomConfig) {
        self.zoom_target = bounds.clamp(self.zoom_target + delta);
    }
}

/// Cloneable handle to the control state. Every access is a single short
/// read-modify-write; the lock is never held across I/O or inference.
#[derive(Debug, Clone)]
pub struct SharedControl {
    inner: Arc<Mutex<ControlState>>,
}

impl SharedControl {
    pub fn new(motion: &MotionConfig, zoom: &ZoomConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ControlState::new(motion, zoom))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        // A panicking writer leaves plain numbers behind; keep using them.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ControlState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> ControlState {
        self.lock().clone()
    }

    pub fn gesture(&self) -> GestureState {
        self.lock().gesture
    }

    pub fn set_image_count(&self, count: usize) {
        self.lock().image_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ControlState {
        ControlState::new(&MotionConfig::default(), &ZoomConfig::default())
    }

    #[test]
    fn starts_with_slow_spin_and_unit_zoom() {
        let s = state();
        assert_eq!(s.velocity, Vector2::new(0.0, 0.005));
        assert_eq!(s.zoom_target, 1.0);
        assert!(!s.gesture.hand_present);
        assert!(s.pending_rotation().is_none());
    }

    #[test]
    fn latest_command_wins() {
        let mut s = state();
        s.post_rotation(RotationCommand::Impulse { y: 0.01 });
        s.post_rotation(RotationCommand::Stop);
        assert_eq!(s.take_rotation(), Some(RotationCommand::Stop));
        assert_eq!(s.take_rotation(), None);
    }

    #[test]
    fn zoom_steps_are_clamped() {
        let bounds = ZoomConfig::default();
        let mut s = state();
        s.step_zoom(5.0, &bounds);
        assert_eq!(s.zoom_target, 1.2);
        s.step_zoom(-5.0, &bounds);
        assert_eq!(s.zoom_target, 0.4);
    }

    #[test]
    fn clones_share_state() {
        let control = SharedControl::new(&MotionConfig::default(), &ZoomConfig::default());
        let other = control.clone();
        other.set_image_count(7);
        assert_eq!(control.snapshot().image_count, 7);
    }
}
