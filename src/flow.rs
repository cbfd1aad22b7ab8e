//! Sparse pyramidal Lucas-Kanade optical flow, used as a fallback diagnostic.
//!
//! Corners of the earlier frame are tracked into the later one with a
//! translation-only inverse-compositional LK, coarse to fine. The score is
//! three times the median displacement of the tracked corners.

use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::corners::corners_fast9;

use crate::difference::check_shape;
use crate::error::Result;
use crate::frame::Frame;

/// Scale applied to the median displacement.
pub const FLOW_SCORE_SCALE: f64 = 3.0;

const MAX_CORNERS: usize = 100;
const CORNER_MIN_DISTANCE: f32 = 10.0;
const CORNER_THRESHOLD: u8 = 20;
/// More corners than this are needed before anything is tracked.
const MIN_CORNERS: usize = 10;
/// More tracked corners than this are needed for a score.
const MIN_TRACKED: usize = 5;

/// f32 copy of a pyramid level, sampled with clamped bilinear interpolation.
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    fn from_gray(img: &GrayImage) -> Plane {
        Plane {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    fn sample(&self, x: f32, y: f32) -> f32 {
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let y = y.clamp(0.0, (self.height - 1) as f32);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
        let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Halving pyramid, level 0 first. Stops before a level gets smaller than
/// the tracking window.
fn pyramid(img: &GrayImage, levels: usize, min_size: u32) -> Vec<Plane> {
    let mut planes = vec![Plane::from_gray(img)];
    let mut current = img.clone();
    for _ in 1..levels {
        let (w, h) = (current.width() / 2, current.height() / 2);
        if w < min_size || h < min_size {
            break;
        }
        current = imageops::resize(&current, w, h, FilterType::Triangle);
        planes.push(Plane::from_gray(&current));
    }
    planes
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackStatus {
    Tracked,
    /// Singular structure tensor somewhere along the pyramid.
    Lost,
    OutOfBounds,
}

#[derive(Debug, Clone)]
pub struct LkTracker {
    /// Patch half-size; the patch is `(2 * half_window + 1)^2`.
    pub half_window: usize,
    pub max_iterations: usize,
    /// Convergence threshold in pixels.
    pub epsilon: f32,
    pub levels: usize,
}

impl Default for LkTracker {
    fn default() -> Self {
        Self {
            half_window: 10,
            max_iterations: 30,
            epsilon: 0.01,
            levels: 4,
        }
    }
}

impl LkTracker {
    /// Tracks every point of `points` from `prev` into `cur`, returning the
    /// new position and its status.
    pub fn track(
        &self,
        prev: &GrayImage,
        cur: &GrayImage,
        points: &[(f32, f32)],
    ) -> Vec<((f32, f32), TrackStatus)> {
        let min_size = (2 * self.half_window + 1) as u32;
        let prev_pyr = pyramid(prev, self.levels, min_size);
        let cur_pyr = pyramid(cur, self.levels, min_size);
        let levels = prev_pyr.len().min(cur_pyr.len());
        let (w, h) = (prev.width() as f32, prev.height() as f32);

        points
            .iter()
            .map(|&(x, y)| {
                let mut d = (0.0f32, 0.0f32);
                for level in (0..levels).rev() {
                    let scale = 1.0 / (1u32 << level) as f32;
                    let Some(nd) =
                        self.refine(&prev_pyr[level], &cur_pyr[level], x * scale, y * scale, d)
                    else {
                        return ((x + d.0 / scale, y + d.1 / scale), TrackStatus::Lost);
                    };
                    d = nd;
                    if level > 0 {
                        d = (d.0 * 2.0, d.1 * 2.0);
                    }
                }
                let p = (x + d.0, y + d.1);
                let status = if p.0 >= 0.0 && p.0 < w && p.1 >= 0.0 && p.1 < h {
                    TrackStatus::Tracked
                } else {
                    TrackStatus::OutOfBounds
                };
                (p, status)
            })
            .collect()
    }

    /// Inverse-compositional iterations at one level; `None` when the
    /// template has no 2D structure.
    fn refine(
        &self,
        prev: &Plane,
        cur: &Plane,
        x: f32,
        y: f32,
        (mut dx, mut dy): (f32, f32),
    ) -> Option<(f32, f32)> {
        let r = self.half_window as i32;
        let mut template = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        let (mut h00, mut h01, mut h11) = (0f32, 0f32, 0f32);
        for py in -r..=r {
            for px in -r..=r {
                let (tx, ty) = (x + px as f32, y + py as f32);
                let gx = 0.5 * (prev.sample(tx + 1.0, ty) - prev.sample(tx - 1.0, ty));
                let gy = 0.5 * (prev.sample(tx, ty + 1.0) - prev.sample(tx, ty - 1.0));
                h00 += gx * gx;
                h01 += gx * gy;
                h11 += gy * gy;
                template.push((px as f32, py as f32, prev.sample(tx, ty), gx, gy));
            }
        }
        let det = h00 * h11 - h01 * h01;
        if det.abs() < 1e-6 {
            return None;
        }
        let inv = 1.0 / det;

        for _ in 0..self.max_iterations {
            let (mut b0, mut b1) = (0f32, 0f32);
            for &(px, py, t, gx, gy) in &template {
                let e = t - cur.sample(x + dx + px, y + dy + py);
                b0 += gx * e;
                b1 += gy * e;
            }
            let ddx = inv * (h11 * b0 - h01 * b1);
            let ddy = inv * (h00 * b1 - h01 * b0);
            dx += ddx;
            dy += ddy;
            if ddx * ddx + ddy * ddy < self.epsilon * self.epsilon {
                break;
            }
        }
        Some((dx, dy))
    }
}

/// Strongest FAST corners, greedily thinned to a minimum spacing.
pub fn track_points(img: &GrayImage) -> Vec<(f32, f32)> {
    let mut corners = corners_fast9(img, CORNER_THRESHOLD);
    corners.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });
    let mut kept: Vec<(f32, f32)> = Vec::new();
    let min_d2 = CORNER_MIN_DISTANCE * CORNER_MIN_DISTANCE;
    for c in corners {
        let p = (c.x as f32, c.y as f32);
        if kept
            .iter()
            .all(|q| (p.0 - q.0).powi(2) + (p.1 - q.1).powi(2) >= min_d2)
        {
            kept.push(p);
            if kept.len() == MAX_CORNERS {
                break;
            }
        }
    }
    kept
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Three times the median corner displacement from `a` to `b`. Zero when
/// too few corners are found or tracked.
pub fn optical_flow_score(a: &Frame, b: &Frame) -> Result<f64> {
    check_shape(&a.image, &b.image)?;
    let points = track_points(&a.image);
    if points.len() <= MIN_CORNERS {
        return Ok(0.0);
    }
    let tracked = LkTracker::default().track(&a.image, &b.image, &points);
    let mut displacements: Vec<f64> = points
        .iter()
        .zip(&tracked)
        .filter(|(_, (_, status))| *status == TrackStatus::Tracked)
        .map(|(p, (q, _))| ((q.0 - p.0) as f64).hypot((q.1 - p.1) as f64))
        .collect();
    if displacements.len() <= MIN_TRACKED {
        return Ok(0.0);
    }
    Ok(median(&mut displacements).unwrap_or(0.0) * FLOW_SCORE_SCALE)
}
