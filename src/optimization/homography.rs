use arrayvec::ArrayVec;
use arrsac::Arrsac;
use glam::DVec2;
use log::debug;
use nalgebra as na;
use rand_core::SeedableRng;
use rand_pcg::Pcg64;
use sample_consensus::{Consensus, Estimator, Model};

use super::linear::{is_degenerate_sample, solve_homography};
use crate::error::{MotionError, Result};

/// Minimum number of correspondences for a projective fit.
pub const MIN_POINTS: usize = 4;

const SAMPLE_AREA_EPS: f64 = 1e-2;

/// One point pair, `dst ~ H * src`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub src: DVec2,
    pub dst: DVec2,
}

/// Planar projective transform with `h22 == 1` and one inlier flag per input pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    pub matrix: na::Matrix3<f64>,
    pub inlier_mask: Vec<bool>,
}

impl Homography {
    pub fn inlier_count(&self) -> usize {
        self.inlier_mask.iter().filter(|&&b| b).count()
    }

    pub fn inlier_ratio(&self) -> f64 {
        if self.inlier_mask.is_empty() {
            0.0
        } else {
            self.inlier_count() as f64 / self.inlier_mask.len() as f64
        }
    }

    pub fn transform_point(&self, p: DVec2) -> Option<DVec2> {
        project(&self.matrix, &p)
    }

    /// Row-major copy of the matrix.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }
}

pub fn project(h: &na::Matrix3<f64>, p: &DVec2) -> Option<DVec2> {
    let q = h * na::Vector3::new(p.x, p.y, 1.0);
    if q.z.abs() < f64::EPSILON {
        None
    } else {
        Some(DVec2::new(q.x / q.z, q.y / q.z))
    }
}

/// Hypothesis handed around by the consensus process.
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyModel(pub na::Matrix3<f64>);

impl Model<Correspondence> for HomographyModel {
    /// Forward reprojection error in pixels.
    fn residual(&self, data: &Correspondence) -> f64 {
        project(&self.0, &data.src).map_or(f64::INFINITY, |p| p.distance(data.dst))
    }
}

/// Minimal four-point solver; samples with three (nearly) collinear points
/// on either side produce no hypothesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct FourPoint;

impl Estimator<Correspondence> for FourPoint {
    type Model = HomographyModel;
    type ModelIter = ArrayVec<HomographyModel, 1>;
    const MIN_SAMPLES: usize = MIN_POINTS;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = Correspondence> + Clone,
    {
        let mut models = ArrayVec::new();
        let sample: ArrayVec<Correspondence, MIN_POINTS> = data.take(MIN_POINTS).collect();
        if sample.len() < MIN_POINTS {
            return models;
        }
        let src = [sample[0].src, sample[1].src, sample[2].src, sample[3].src];
        let dst = [sample[0].dst, sample[1].dst, sample[2].dst, sample[3].dst];
        if is_degenerate_sample(&src, SAMPLE_AREA_EPS) || is_degenerate_sample(&dst, SAMPLE_AREA_EPS) {
            return models;
        }
        if let Some(h) = solve_homography(&src, &dst) {
            models.push(HomographyModel(h));
        }
        models
    }
}

fn inlier_mask(model: &HomographyModel, data: &[Correspondence], threshold: f64) -> Vec<bool> {
    data.iter().map(|c| model.residual(c) <= threshold).collect()
}

/// Robust homography fit: ARRSAC over four-point hypotheses, consensus by
/// forward reprojection error, final least-squares refit on the consensus set.
#[derive(Debug, Clone)]
pub struct HomographyEstimator {
    pub reproj_threshold: f64,
    pub seed: u64,
}

impl Default for HomographyEstimator {
    fn default() -> Self {
        Self {
            reproj_threshold: 3.0,
            seed: 0,
        }
    }
}

impl HomographyEstimator {
    pub fn new(reproj_threshold: f64, seed: u64) -> Self {
        Self {
            reproj_threshold,
            seed,
        }
    }

    /// Fits `dst ~ H * src`. The sampler is reseeded on every call so equal
    /// inputs give equal results.
    pub fn estimate(&self, src: &[DVec2], dst: &[DVec2]) -> Result<Homography> {
        if src.len() != dst.len() {
            return Err(MotionError::PointCountMismatch {
                left: src.len(),
                right: dst.len(),
            });
        }
        if src.len() < MIN_POINTS {
            return Err(MotionError::InsufficientPoints {
                required: MIN_POINTS,
                got: src.len(),
            });
        }

        let data: Vec<Correspondence> = src
            .iter()
            .zip(dst)
            .map(|(&src, &dst)| Correspondence { src, dst })
            .collect();
        let mut arrsac = Arrsac::new(self.reproj_threshold, Pcg64::seed_from_u64(self.seed));
        let Some((model, inliers)) = arrsac.model_inliers(&FourPoint, data.iter().copied()) else {
            return Err(MotionError::DegenerateConfiguration(format!(
                "no usable hypothesis among {} correspondences",
                data.len()
            )));
        };

        let mask = inlier_mask(&model, &data, self.reproj_threshold);
        let count = mask.iter().filter(|&&b| b).count();
        if count < MIN_POINTS {
            return Err(MotionError::DegenerateConfiguration(format!(
                "best hypothesis has only {} inliers",
                count
            )));
        }
        debug!(
            "arrsac: {} / {} inliers before refit ({} reported)",
            count,
            data.len(),
            inliers.len()
        );

        let (consensus_src, consensus_dst): (Vec<DVec2>, Vec<DVec2>) = data
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(c, _)| (c.src, c.dst))
            .unzip();
        let (model, mask) = solve_homography(&consensus_src, &consensus_dst)
            .map(HomographyModel)
            .and_then(|refit| {
                let refit_mask = inlier_mask(&refit, &data, self.reproj_threshold);
                let refit_count = refit_mask.iter().filter(|&&b| b).count();
                (refit_count >= count).then_some((refit, refit_mask))
            })
            .unwrap_or((model, mask));

        Ok(Homography {
            matrix: model.0,
            inlier_mask: mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corr(sx: f64, sy: f64, dx: f64, dy: f64) -> Correspondence {
        Correspondence {
            src: DVec2::new(sx, sy),
            dst: DVec2::new(dx, dy),
        }
    }

    #[test]
    fn four_point_solves_translation() {
        let data = [
            corr(0.0, 0.0, 5.0, 1.0),
            corr(100.0, 0.0, 105.0, 1.0),
            corr(100.0, 80.0, 105.0, 81.0),
            corr(0.0, 80.0, 5.0, 81.0),
        ];
        let models = FourPoint.estimate(data.iter().copied());
        assert_eq!(models.len(), 1);
        for c in &data {
            assert!(models[0].residual(c) < 1e-9);
        }
    }

    #[test]
    fn four_point_skips_collinear_sample() {
        let data = [
            corr(0.0, 0.0, 0.0, 0.0),
            corr(10.0, 10.0, 10.0, 10.0),
            corr(20.0, 20.0, 20.0, 20.0),
            corr(0.0, 30.0, 0.0, 30.0),
        ];
        assert!(FourPoint.estimate(data.iter().copied()).is_empty());
    }

    #[test]
    fn rows_match_matrix() {
        let h = Homography {
            matrix: na::Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 1.0),
            inlier_mask: vec![true, false],
        };
        assert_eq!(h.to_rows()[1], [4.0, 5.0, 6.0]);
        assert_eq!(h.to_rows()[2][0], 7.0);
        assert_eq!(h.inlier_ratio(), 0.5);
    }
}
