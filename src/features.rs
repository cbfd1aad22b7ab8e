//! Oriented FAST keypoints with rotated BRIEF descriptors.
//!
//! Every pyramid level runs a FAST-9 segment test, keeps local maxima of the
//! corner score, assigns an orientation from the intensity centroid of the
//! surrounding disc and samples a 256-bit binary descriptor on a smoothed copy
//! of the level, with the sampling pattern rotated by that orientation.

use glam::Vec2;
use image::imageops::{self, FilterType};
use image::GrayImage;
use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::ExtractorConfig;
use crate::frame::Frame;

/// Below this many keypoints a frame is reported as featureless.
pub const MIN_KEYPOINTS: usize = 4;

const FAST_ARC: usize = 9;
const ORIENTATION_RADIUS: i32 = 15;
const PATTERN_RADIUS: i32 = 12;
const EDGE: u32 = 16;
const DESCRIPTOR_BITS: usize = 256;
const DESCRIPTOR_SIGMA: f32 = 2.0;
const PATTERN_SEED: u64 = 0x5eed_0b1e;

/// Bresenham circle of radius 3, clockwise from 12 o'clock.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// 256-bit binary descriptor.
pub type Descriptor = [u8; 32];

pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Location in level-0 pixel coordinates.
    pub p2d: Vec2,
    /// Radians, image coordinates (y down).
    pub angle: f32,
    pub response: f32,
    pub level: usize,
}

/// Keypoints and their descriptors for one frame, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct FrameFeatures {
    pub frame_index: usize,
    pub img_w_h: (u32, u32),
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl FrameFeatures {
    pub fn empty(frame_index: usize, img_w_h: (u32, u32)) -> FrameFeatures {
        FrameFeatures {
            frame_index,
            img_w_h,
            keypoints: Vec::new(),
            descriptors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

pub struct FeatureExtractor {
    config: ExtractorConfig,
    pattern: Vec<[(i32, i32); 2]>,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> FeatureExtractor {
        FeatureExtractor {
            config,
            pattern: brief_pattern(),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Detects and describes keypoints on every pyramid level.
    ///
    /// Deterministic for a given frame and configuration. A frame yielding
    /// fewer than [`MIN_KEYPOINTS`] keypoints comes back empty.
    pub fn extract(&self, frame: &Frame) -> FrameFeatures {
        let img_w_h = frame.dimensions();
        let base = if self.config.blur_sigma > 0.0 {
            imageops::blur(&frame.image, self.config.blur_sigma)
        } else {
            frame.image.clone()
        };

        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        for (level, budget) in self.level_budgets().into_iter().enumerate() {
            let scale = self.config.scale_factor.powi(level as i32);
            let resized;
            let img: &GrayImage = if level == 0 {
                &base
            } else {
                let w = (base.width() as f32 / scale).round() as u32;
                let h = (base.height() as f32 / scale).round() as u32;
                resized = imageops::resize(&base, w.max(1), h.max(1), FilterType::Triangle);
                &resized
            };
            if img.width() <= 2 * EDGE || img.height() <= 2 * EDGE {
                break;
            }

            let mut corners = local_maxima(&fast_scores(img, self.config.fast_threshold), img);
            corners.sort_by(|a, b| {
                b.2.total_cmp(&a.2)
                    .then(a.1.cmp(&b.1))
                    .then(a.0.cmp(&b.0))
            });
            corners.truncate(budget);
            trace!("level {} kept {} corners", level, corners.len());

            let smooth = imageops::blur(img, DESCRIPTOR_SIGMA);
            for (x, y, response) in corners {
                let angle = orientation(img, x, y);
                descriptors.push(self.describe(&smooth, x, y, angle));
                keypoints.push(Keypoint {
                    p2d: Vec2::new(x as f32 * scale, y as f32 * scale),
                    angle,
                    response,
                    level,
                });
            }
        }

        if keypoints.len() < MIN_KEYPOINTS {
            trace!(
                "frame {} has only {} keypoints",
                frame.index,
                keypoints.len()
            );
            return FrameFeatures::empty(frame.index, img_w_h);
        }
        FrameFeatures {
            frame_index: frame.index,
            img_w_h,
            keypoints,
            descriptors,
        }
    }

    /// Splits `n_features` over the levels as a geometric series in `1 / scale_factor`.
    pub fn level_budgets(&self) -> Vec<usize> {
        let n = self.config.n_levels.max(1);
        let inv = 1.0 / self.config.scale_factor as f64;
        let first = if n == 1 {
            self.config.n_features as f64
        } else {
            self.config.n_features as f64 * (1.0 - inv) / (1.0 - inv.powi(n as i32))
        };
        let mut budgets: Vec<usize> = (0..n)
            .map(|l| (first * inv.powi(l as i32)).round() as usize)
            .collect();
        let assigned: usize = budgets[..n - 1].iter().sum();
        budgets[n - 1] = self.config.n_features.saturating_sub(assigned);
        budgets
    }

    fn describe(&self, smooth: &GrayImage, x: u32, y: u32, angle: f32) -> Descriptor {
        let (s, c) = angle.sin_cos();
        let sample = |(px, py): (i32, i32)| -> u8 {
            let rx = (c * px as f32 - s * py as f32).round() as i32;
            let ry = (s * px as f32 + c * py as f32).round() as i32;
            smooth.get_pixel((x as i32 + rx) as u32, (y as i32 + ry) as u32)[0]
        };
        let mut desc = [0u8; 32];
        for (i, [a, b]) in self.pattern.iter().enumerate() {
            if sample(*a) < sample(*b) {
                desc[i / 8] |= 1 << (i % 8);
            }
        }
        desc
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

/// Fixed pseudo-random point pairs inside a disc, identical for every extractor.
fn brief_pattern() -> Vec<[(i32, i32); 2]> {
    let mut rng = ChaCha8Rng::seed_from_u64(PATTERN_SEED);
    let mut point = move || loop {
        let p = (
            rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS),
            rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS),
        );
        if p.0 * p.0 + p.1 * p.1 <= PATTERN_RADIUS * PATTERN_RADIUS {
            return p;
        }
    };
    (0..DESCRIPTOR_BITS)
        .map(|_| loop {
            let a = point();
            let b = point();
            if a != b {
                break [a, b];
            }
        })
        .collect()
}

fn has_arc(ring: &[i32; 16], sign: i32, t: i32) -> bool {
    let mut run = 0;
    for k in 0..16 + FAST_ARC - 1 {
        if ring[k % 16] * sign > t {
            run += 1;
            if run >= FAST_ARC {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn fast_score(raw: &[u8], stride: usize, x: usize, y: usize, threshold: i32) -> f32 {
    let c = raw[y * stride + x] as i32;
    let mut ring = [0i32; 16];
    for (k, (dx, dy)) in CIRCLE.iter().enumerate() {
        let xx = (x as i32 + dx) as usize;
        let yy = (y as i32 + dy) as usize;
        ring[k] = raw[yy * stride + xx] as i32 - c;
    }
    let mut best = 0;
    for sign in [1, -1] {
        if has_arc(&ring, sign, threshold) {
            let s: i32 = ring.iter().map(|d| (d * sign - threshold).max(0)).sum();
            best = best.max(s);
        }
    }
    best as f32
}

/// FAST-9 score per pixel, zero where the segment test fails or near the border.
fn fast_scores(img: &GrayImage, threshold: u8) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let stride = w as usize;
    let raw = img.as_raw();
    let mut scores = vec![0f32; stride * h as usize];
    scores
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            if (y as u32) < EDGE || y as u32 >= h - EDGE {
                return;
            }
            for x in EDGE as usize..(w - EDGE) as usize {
                row[x] = fast_score(raw, stride, x, y, threshold as i32);
            }
        });
    scores
}

/// 3x3 non-maximum suppression; on plateaus the first pixel in raster order wins.
fn local_maxima(scores: &[f32], img: &GrayImage) -> Vec<(u32, u32, f32)> {
    let (w, h) = img.dimensions();
    let stride = w as usize;
    (EDGE..h - EDGE)
        .into_par_iter()
        .flat_map_iter(|y| {
            (EDGE..w - EDGE).filter_map(move |x| {
                let s = scores[y as usize * stride + x as usize];
                if s <= 0.0 {
                    return None;
                }
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let ny = (y as i32 + dy) as usize;
                        let nx = (x as i32 + dx) as usize;
                        let n = scores[ny * stride + nx];
                        let before = dy < 0 || (dy == 0 && dx < 0);
                        if n > s || (before && n == s) {
                            return None;
                        }
                    }
                }
                Some((x, y, s))
            })
        })
        .collect()
}

/// Intensity-centroid angle over a disc of radius 15.
fn orientation(img: &GrayImage, x: u32, y: u32) -> f32 {
    let mut m01 = 0f32;
    let mut m10 = 0f32;
    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        let span = ((ORIENTATION_RADIUS * ORIENTATION_RADIUS - dy * dy) as f32).sqrt() as i32;
        for dx in -span..=span {
            let v = img.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0] as f32;
            m10 += dx as f32 * v;
            m01 += dy as f32 * v;
        }
    }
    m01.atan2(m10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_counts_differing_bits() {
        let a = [0u8; 32];
        let mut b = [0u8; 32];
        assert_eq!(hamming(&a, &b), 0);
        b[0] = 0b1011;
        b[31] = 0xff;
        assert_eq!(hamming(&a, &b), 11);
    }

    #[test]
    fn budgets_sum_to_feature_count() {
        for n_levels in 1..6 {
            let extractor = FeatureExtractor::new(ExtractorConfig {
                n_levels,
                ..Default::default()
            });
            let budgets = extractor.level_budgets();
            assert_eq!(budgets.len(), n_levels);
            assert_eq!(budgets.iter().sum::<usize>(), 2000);
            assert!(budgets.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn pattern_stays_inside_border() {
        let pattern = brief_pattern();
        assert_eq!(pattern.len(), DESCRIPTOR_BITS);
        let limit = (EDGE as f32) - 1.0;
        for [a, b] in pattern {
            for (x, y) in [a, b] {
                assert!(((x * x + y * y) as f32).sqrt() + 0.75 < limit);
            }
        }
    }

    #[test]
    fn corner_is_detected() {
        let mut img = GrayImage::from_pixel(64, 64, image::Luma([30]));
        for y in 32..64 {
            for x in 32..64 {
                img.put_pixel(x, y, image::Luma([220]));
            }
        }
        let scores = fast_scores(&img, 20);
        let corners = local_maxima(&scores, &img);
        assert!(!corners.is_empty());
        assert!(
            corners
                .iter()
                .any(|&(x, y, _)| (x as i32 - 32).abs() <= 1 && (y as i32 - 32).abs() <= 1)
        );
    }
}
