use image::GrayImage;
use imageproc::edges::canny;
use rayon::prelude::*;

use crate::error::{MotionError, Result};
use crate::frame::Frame;

pub(crate) fn check_shape(a: &GrayImage, b: &GrayImage) -> Result<()> {
    if a.dimensions() != b.dimensions() {
        return Err(MotionError::ShapeMismatch {
            expected: a.dimensions(),
            got: b.dimensions(),
        });
    }
    Ok(())
}

/// Mean absolute intensity difference of two equally sized frames, in 8-bit units.
pub fn diff_score(a: &Frame, b: &Frame) -> Result<f64> {
    mean_abs_diff(&a.image, &b.image)
}

pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    check_shape(a, b)?;
    let n = a.as_raw().len();
    if n == 0 {
        return Ok(0.0);
    }
    let total: u64 = a
        .as_raw()
        .par_iter()
        .zip(b.as_raw().par_iter())
        .map(|(&p, &q)| p.abs_diff(q) as u64)
        .sum();
    Ok(total as f64 / n as f64)
}

/// Fraction of pixels whose absolute difference exceeds `threshold`.
pub fn changed_fraction(a: &Frame, b: &Frame, threshold: u8) -> Result<f64> {
    check_shape(&a.image, &b.image)?;
    let n = a.image.as_raw().len();
    if n == 0 {
        return Ok(0.0);
    }
    let changed = a
        .image
        .as_raw()
        .par_iter()
        .zip(b.image.as_raw().par_iter())
        .filter(|&(&p, &q)| p.abs_diff(q) > threshold)
        .count();
    Ok(changed as f64 / n as f64)
}

/// Canny hysteresis thresholds of the edge diagnostic.
pub const EDGE_THRESHOLDS: (f32, f32) = (50.0, 150.0);

/// Half the mean absolute difference of the two Canny edge maps.
pub fn edge_motion_score(a: &Frame, b: &Frame) -> Result<f64> {
    check_shape(&a.image, &b.image)?;
    let (low, high) = EDGE_THRESHOLDS;
    let edges_a = canny(&a.image, low, high);
    let edges_b = canny(&b.image, low, high);
    Ok(mean_abs_diff(&edges_a, &edges_b)? * 0.5)
}
