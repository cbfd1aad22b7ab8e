use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Motion components read off a homography.
///
/// This is the affine-dominant approximation, not a full projective
/// decomposition: translation is taken verbatim from the last column, rotation
/// and scale from the upper-left block, perspective from the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParameters {
    pub translation_x: f64,
    pub translation_y: f64,
    /// Degrees, positive is clockwise on screen (y axis points down).
    pub rotation_angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub perspective_magnitude: f64,
}

impl MotionParameters {
    pub fn translation_magnitude(&self) -> f64 {
        self.translation_x.hypot(self.translation_y)
    }

    /// Largest deviation of either axis scale from 1.
    pub fn scale_deviation(&self) -> f64 {
        (1.0 - self.scale_x).abs().max((1.0 - self.scale_y).abs())
    }
}

impl Default for MotionParameters {
    fn default() -> Self {
        Self {
            translation_x: 0.0,
            translation_y: 0.0,
            rotation_angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            perspective_magnitude: 0.0,
        }
    }
}

pub fn decompose(h: &na::Matrix3<f64>) -> MotionParameters {
    MotionParameters {
        translation_x: h[(0, 2)],
        translation_y: h[(1, 2)],
        rotation_angle: h[(1, 0)].atan2(h[(0, 0)]).to_degrees(),
        scale_x: h[(0, 0)].hypot(h[(1, 0)]),
        scale_y: h[(0, 1)].hypot(h[(1, 1)]),
        perspective_magnitude: h[(2, 0)].hypot(h[(2, 1)]),
    }
}
