use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// One marker candidate: subpixel center and correlation score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatchItem {
    pub point: Point2<f64>,
    pub score: f64,
}

impl TemplateMatchItem {
    pub fn new(point: Point2<f64>, score: f64) -> Self {
        Self { point, score }
    }
}

/// The two move-reference markers, ordered by x.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveTargets {
    pub left: Point2<f64>,
    pub right: Point2<f64>,
}

/// Displacement of the move targets relative to a reference position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveDrift {
    pub left: Vector2<f64>,
    pub right: Vector2<f64>,
    /// Larger of the two offset magnitudes, in pixels.
    pub max_px: f64,
}

impl MoveTargets {
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        if a.x <= b.x {
            Self { left: a, right: b }
        } else {
            Self { left: b, right: a }
        }
    }

    pub fn drift_from(&self, reference: &MoveTargets) -> MoveDrift {
        let left = self.left - reference.left;
        let right = self.right - reference.right;
        MoveDrift {
            left,
            right,
            max_px: left.norm().max(right.norm()),
        }
    }
}

impl MoveDrift {
    /// True if either marker moved farther than `tolerance_px`.
    pub fn exceeds(&self, tolerance_px: f64) -> bool {
        self.max_px > tolerance_px
    }
}
