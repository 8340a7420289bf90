// src/landmarks.rs - One inference result: at most one hand in normalized image space
use nalgebra::Vector3;

// MediaPipe hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;

/// The middle finger knuckle stands in for the palm centroid.
pub const PALM_CENTER: usize = MIDDLE_MCP;

pub const HAND_LANDMARK_COUNT: usize = 21;

// Smallest point set that still carries thumb tip, index tip and palm center.
const MIN_POINTS: usize = MIDDLE_MCP + 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkFrame {
    points: Option<Vec<Vector3<f64>>>,
}

impl LandmarkFrame {
    /// A frame in which no hand was detected.
    pub fn empty() -> Self {
        Self { points: None }
    }

    pub fn hand(points: Vec<Vector3<f64>>) -> Self {
        Self {
            points: Some(points),
        }
    }

    /// Builds a frame from detector output shaped like `multiHandLandmarks`;
    /// only the first hand is tracked.
    pub fn from_hands(hands: &[Vec<[f64; 3]>]) -> Self {
        match hands.first() {
            Some(hand) => Self::hand(
                hand.iter()
                    .map(|lm| Vector3::new(lm[0], lm[1], lm[2]))
                    .collect(),
            ),
            None => Self::empty(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.points
            .as_ref()
            .map_or(false, |points| points.len() >= MIN_POINTS)
    }

    pub fn landmark(&self, index: usize) -> Option<Vector3<f64>> {
        self.points.as_ref()?.get(index).copied()
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        self.points.as_deref().unwrap_or(&[])
    }

    pub fn palm_center(&self) -> Option<Vector3<f64>> {
        self.landmark(PALM_CENTER)
    }

    /// Thumb tip to index tip distance in the image plane; depth is ignored.
    pub fn pinch_distance(&self) -> Option<f64> {
        let thumb = self.landmark(THUMB_TIP)?;
        let index = self.landmark(INDEX_TIP)?;
        Some(((thumb.x - index.x).powi(2) + (thumb.y - index.y).powi(2)).sqrt())
    }

    /// A plausible open hand centred on `(palm_x, palm_y)` whose thumb and
    /// index tips sit `pinch_gap` apart.
    pub fn synthetic_hand(palm_x: f64, palm_y: f64, pinch_gap: f64) -> Self {
        let mut points = Vec::with_capacity(HAND_LANDMARK_COUNT);
        for i in 0..HAND_LANDMARK_COUNT {
            let finger = i.saturating_sub(1) / 4;
            let joint = i.saturating_sub(1) % 4;
            let x = palm_x + (finger as f64 - 2.0) * 0.03;
            let y = palm_y - 0.02 * joint as f64 + if i == WRIST { 0.1 } else { 0.0 };
            points.push(Vector3::new(x, y, 0.0));
        }

        points[PALM_CENTER] = Vector3::new(palm_x, palm_y, 0.0);
        let tips_y = palm_y - 0.08;
        points[THUMB_TIP] = Vector3::new(palm_x - pinch_gap / 2.0, tips_y, -0.01);
        points[INDEX_TIP] = Vector3::new(palm_x + pinch_gap / 2.0, tips_y, 0.02);

        Self::hand(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_absent() {
        let frame = LandmarkFrame::empty();
        assert!(!frame.is_present());
        assert!(frame.palm_center().is_none());
        assert!(frame.pinch_distance().is_none());
    }

    #[test]
    fn truncated_hand_is_absent() {
        let frame = LandmarkFrame::hand(vec![Vector3::zeros(); 5]);
        assert!(!frame.is_present());
    }

    #[test]
    fn pinch_distance_ignores_depth() {
        let frame = LandmarkFrame::synthetic_hand(0.5, 0.5, 0.04);
        let distance = frame.pinch_distance().unwrap();
        assert!((distance - 0.04).abs() < 1e-12);
    }

    #[test]
    fn only_first_hand_is_used() {
        let first: Vec<[f64; 3]> = (0..21).map(|i| [0.1, i as f64 * 0.01, 0.0]).collect();
        let second: Vec<[f64; 3]> = (0..21).map(|_| [0.9, 0.9, 0.0]).collect();
        let frame = LandmarkFrame::from_hands(&[first, second]);
        assert!(frame.is_present());
        assert_eq!(frame.palm_center().unwrap().x, 0.1);
    }

    #[test]
    fn no_hands_gives_empty_frame() {
        assert_eq!(LandmarkFrame::from_hands(&[]), LandmarkFrame::empty());
    }
}
