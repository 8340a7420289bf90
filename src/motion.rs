// src/motion.rs - Per display frame damping, integration and easing
use crate::config::{MotionConfig, ZoomConfig};
use crate::control::{RotationCommand, SharedControl};
use nalgebra::Vector2;

/// Anything that can receive the eased transform once per display frame.
pub trait SceneTransform {
    /// `rotation` is Euler x/y in radians, `scale` is uniform.
    fn apply(&mut self, rotation: Vector2<f64>, scale: f64);
}

/// Render-only copies; never read back as authoritative state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedRenderState {
    pub display_rotation: Vector2<f64>,
    pub display_zoom: f64,
}

pub struct MotionIntegrator {
    config: MotionConfig,
    zoom: ZoomConfig,
    control: SharedControl,
    render: SmoothedRenderState,
}

fn is_finite(v: &Vector2<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

impl MotionIntegrator {
    pub fn new(config: MotionConfig, zoom: ZoomConfig, control: SharedControl) -> Self {
        let render = SmoothedRenderState {
            display_rotation: Vector2::zeros(),
            display_zoom: zoom.clamp(zoom.initial),
        };
        Self {
            config,
            zoom,
            control,
            render,
        }
    }

    pub fn render_state(&self) -> SmoothedRenderState {
        self.render
    }

    /// One display frame: damping and drift, then the pending gesture command,
    /// then integration, then easing of the displayed values.
    pub fn step(&mut self) -> SmoothedRenderState {
        let damping = self.config.damping;
        let zoom = &self.zoom;
        let drift_for = |count| self.config.drift_for(count);

        let (rotation, zoom_target) = self.control.update(|state| {
            let previous = state.rotation;

            state.velocity *= damping;
            state.velocity.y += drift_for(state.image_count);

            match state.take_rotation() {
                Some(RotationCommand::Impulse { y }) => state.velocity.y = y,
                Some(RotationCommand::Stop) => state.velocity = Vector2::zeros(),
                None => {}
            }

            if !is_finite(&state.velocity) {
                state.velocity = Vector2::zeros();
            }
            state.rotation += state.velocity;
            if !is_finite(&state.rotation) {
                state.rotation = if is_finite(&previous) {
                    previous
                } else {
                    Vector2::zeros()
                };
            }

            state.zoom_target = if state.zoom_target.is_finite() {
                zoom.clamp(state.zoom_target)
            } else {
                zoom.clamp(zoom.initial)
            };

            (state.rotation, state.zoom_target)
        });

        let t = self.config.smoothing;
        let r = &mut self.render;
        r.display_rotation.x = lerp(r.display_rotation.x, rotation.x, t);
        r.display_rotation.y = lerp(r.display_rotation.y, rotation.y, t);
        r.display_zoom = lerp(r.display_zoom, zoom_target, t);

        if !is_finite(&r.display_rotation) {
            r.display_rotation = rotation;
        }
        r.display_zoom = if r.display_zoom.is_finite() {
            self.zoom.clamp(r.display_zoom)
        } else {
            zoom_target
        };

        self.render
    }

    /// Steps once and hands the result to the scene.
    pub fn present(&mut self, scene: &mut impl SceneTransform) -> SmoothedRenderState {
        let state = self.step();
        scene.apply(state.display_rotation, state.display_zoom);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn setup(initial_velocity: [f64; 2]) -> (MotionIntegrator, SharedControl) {
        let motion = MotionConfig {
            initial_velocity,
            ..MotionConfig::default()
        };
        let zoom = ZoomConfig::default();
        let control = SharedControl::new(&motion, &zoom);
        (MotionIntegrator::new(motion, zoom, control.clone()), control)
    }

    #[derive(Default)]
    struct RecordingScene {
        calls: Vec<(Vector2<f64>, f64)>,
    }

    impl SceneTransform for RecordingScene {
        fn apply(&mut self, rotation: Vector2<f64>, scale: f64) {
            self.calls.push((rotation, scale));
        }
    }

    #[test]
    fn velocity_decays_geometrically_plus_drift() {
        let (mut integrator, control) = setup([0.02, 0.05]);
        control.set_image_count(1);
        let n = 25;
        for _ in 0..n {
            integrator.step();
        }
        let v = control.snapshot().velocity;
        let decay = 0.92_f64.powi(n);
        let drift = 0.0002 * (1.0 - decay) / (1.0 - 0.92);
        assert!(approx_eq(v.x, 0.02 * decay));
        assert!(approx_eq(v.y, 0.05 * decay + drift));
    }

    #[test]
    fn negative_velocity_never_flips_x() {
        let (mut integrator, control) = setup([-0.1, 0.0]);
        let mut last = -0.1_f64;
        for _ in 0..200 {
            integrator.step();
            let x = control.snapshot().velocity.x;
            assert!(x <= 0.0);
            assert!(x.abs() <= last.abs());
            last = x;
        }
    }

    #[test]
    fn velocity_converges_to_drift_steady_state() {
        let (mut integrator, control) = setup([0.0, 0.3]);
        for _ in 0..600 {
            integrator.step();
        }
        let steady = 0.0005 / (1.0 - 0.92);
        assert!(approx_eq(control.snapshot().velocity.y, steady));
    }

    #[test]
    fn impulse_is_applied_after_damping() {
        let (mut integrator, control) = setup([0.0, 0.1]);
        control.update(|s| s.post_rotation(RotationCommand::Impulse { y: 0.008 }));
        integrator.step();
        let state = control.snapshot();
        assert_eq!(state.velocity.y, 0.008);
        assert!(state.pending_rotation().is_none());
    }

    #[test]
    fn stop_zeroes_velocity_despite_drift() {
        let (mut integrator, control) = setup([0.03, 0.2]);
        control.update(|s| s.post_rotation(RotationCommand::Stop));
        let before = control.snapshot().rotation;
        integrator.step();
        let state = control.snapshot();
        assert_eq!(state.velocity, Vector2::zeros());
        assert_eq!(state.rotation, before);
    }

    #[test]
    fn display_rotation_approaches_target_without_overshoot() {
        let (mut integrator, control) = setup([0.0, 0.0]);
        control.update(|s| s.rotation = Vector2::new(1.0, 2.0));
        // Make the rotation target static for the test.
        let mut gap = f64::MAX;
        for _ in 0..100 {
            control.update(|s| {
                s.velocity = Vector2::zeros();
                s.image_count = 1;
                s.post_rotation(RotationCommand::Stop);
            });
            let r = integrator.step();
            assert!(r.display_rotation.x <= 1.0);
            assert!(r.display_rotation.y <= 2.0);
            let new_gap = 2.0 - r.display_rotation.y;
            assert!(new_gap < gap);
            gap = new_gap;
        }
        let r = integrator.render_state();
        assert!((r.display_rotation.y - 2.0).abs() < 2.0 * 0.9_f64.powi(100) + 1e-12);
    }

    #[test]
    fn display_zoom_follows_target() {
        let (mut integrator, control) = setup([0.0, 0.0]);
        control.update(|s| s.zoom_target = 0.4);
        let first = integrator.step();
        assert!(approx_eq(first.display_zoom, 1.0 + (0.4 - 1.0) * 0.1));
        for _ in 0..200 {
            integrator.step();
        }
        assert!(approx_eq(integrator.render_state().display_zoom, 0.4));
    }

    #[test]
    fn non_finite_values_are_recovered() {
        let (mut integrator, control) = setup([0.0, 0.0]);
        control.update(|s| {
            s.velocity = Vector2::new(f64::NAN, f64::INFINITY);
            s.zoom_target = f64::NAN;
        });
        let r = integrator.step();
        let state = control.snapshot();
        assert!(state.velocity.iter().all(|c| c.is_finite()));
        assert!(state.rotation.iter().all(|c| c.is_finite()));
        assert_eq!(state.zoom_target, 1.0);
        assert!(r.display_zoom.is_finite());
        assert!(r.display_rotation.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn present_applies_display_values_to_scene() {
        let (mut integrator, _) = setup([0.0, 0.01]);
        let mut scene = RecordingScene::default();
        let r = integrator.present(&mut scene);
        assert_eq!(scene.calls.len(), 1);
        assert_eq!(scene.calls[0], (r.display_rotation, r.display_zoom));
    }
}
