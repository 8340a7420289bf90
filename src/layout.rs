// src/layout.rs - Even placement of image panels over a sphere
use nalgebra::Vector3;
use std::f32::consts::PI;

/// Fibonacci sphere: `count` points spread evenly from the north pole
/// (`y = radius`) to the south pole. A single point faces the camera.
pub fn fibonacci_sphere(count: usize, radius: f32) -> Vec<Vector3<f32>> {
    match count {
        0 => Vec::new(),
        1 => vec![Vector3::new(0.0, 0.0, radius)],
        _ => {
            let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
            let last = (count - 1) as f32;

            (0..count)
                .map(|i| {
                    let y = 1.0 - (i as f32 / last) * 2.0;
                    let r = (1.0 - y * y).max(0.0).sqrt();
                    let theta = golden_angle * i as f32;
                    Vector3::new(theta.cos() * r, y, theta.sin() * r) * radius
                })
                .collect()
        }
    }
}
