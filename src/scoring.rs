//! Per-pair movement scoring and classification.
//!
//! For each consecutive pair the scorer matches features; with enough good
//! matches it fits a homography, decomposes it and scores the motion. Pairs
//! with too few matches or a degenerate fit fall back to frame differencing,
//! which yields a score but no motion type.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::DVec2;
use image::GrayImage;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierConfig, DetectorConfig, ScoreWeights};
use crate::difference::{changed_fraction, diff_score, edge_motion_score};
use crate::error::Result;
use crate::features::{FeatureExtractor, FrameFeatures};
use crate::flow::optical_flow_score;
use crate::frame::Frame;
use crate::matching::Matcher;
use crate::motion::{MotionParameters, decompose};
use crate::optimization::HomographyEstimator;

/// Per-pixel difference counted as a change by the fallback diagnostics.
pub const CHANGE_THRESHOLD: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MotionType {
    Translation,
    Rotation,
    Scaling,
    Perspective,
    /// Geometric fit below the movement threshold.
    Static,
    /// No geometric basis for a label.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    Homography,
    Fallback,
    /// The pair could not be compared at all, e.g. differing frame sizes.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementResult {
    /// Index of the later frame of the pair.
    pub frame_index: usize,
    pub score: f64,
    pub detected: bool,
    pub motion_type: MotionType,
    pub method: DetectionMethod,
    pub match_count: usize,
    pub inlier_ratio: Option<f64>,
    pub motion: Option<MotionParameters>,
    /// Fitted matrix, row-major, homography path only.
    pub homography: Option<[[f64; 3]; 3]>,
    /// Fallback diagnostics; none of them feeds `score`.
    pub changed_fraction: Option<f64>,
    pub flow_score: Option<f64>,
    pub edge_score: Option<f64>,
}

impl MovementResult {
    pub fn degraded(frame_index: usize) -> MovementResult {
        MovementResult {
            frame_index,
            score: 0.0,
            detected: false,
            motion_type: MotionType::Unknown,
            method: DetectionMethod::Degraded,
            match_count: 0,
            inlier_ratio: None,
            motion: None,
            homography: None,
            changed_fraction: None,
            flow_score: None,
            edge_score: None,
        }
    }
}

/// Weighted sum of motion magnitudes; non-decreasing in each of them.
pub fn movement_score(p: &MotionParameters, w: &ScoreWeights) -> f64 {
    w.translation * p.translation_magnitude()
        + w.rotation * p.rotation_angle.abs()
        + w.scale * p.scale_deviation()
        + w.perspective * p.perspective_magnitude
}

/// Dominant motion type.
///
/// Perspective wins outright above its threshold. Otherwise the contributors
/// are divided by their reference units and the largest one wins, ties going
/// to Rotation, then Scaling, then Translation.
pub fn classify(p: &MotionParameters, c: &ClassifierConfig) -> MotionType {
    if p.perspective_magnitude > c.perspective_threshold {
        return MotionType::Perspective;
    }
    let rotation = p.rotation_angle.abs() / c.rotation_unit;
    let scaling = p.scale_deviation() / c.scale_unit;
    let translation = p.translation_magnitude() / c.translation_unit;
    if rotation == 0.0 && scaling == 0.0 && translation == 0.0 {
        MotionType::Static
    } else if rotation >= scaling && rotation >= translation {
        MotionType::Rotation
    } else if scaling >= translation {
        MotionType::Scaling
    } else {
        MotionType::Translation
    }
}

pub struct MovementScorer {
    config: DetectorConfig,
    extractor: FeatureExtractor,
    matcher: Matcher,
    estimator: HomographyEstimator,
    /// Last frame scored and its features, reused when that exact frame
    /// becomes the earlier frame of the next pair.
    previous: Option<(GrayImage, FrameFeatures)>,
}

impl MovementScorer {
    pub fn new(config: DetectorConfig) -> Result<MovementScorer> {
        config.validate()?;
        Ok(MovementScorer {
            extractor: FeatureExtractor::new(config.extractor.clone()),
            matcher: Matcher::new(config.ratio_test_threshold, config.cross_check),
            estimator: HomographyEstimator::new(config.ransac_reproj_threshold, config.ransac_seed),
            config,
            previous: None,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    fn cached_or_extract(&mut self, frame: &Frame) -> FrameFeatures {
        match self.previous.take() {
            Some((image, f)) if f.frame_index == frame.index && image == frame.image => {
                trace!("reusing features of frame {}", frame.index);
                f
            }
            _ => self.extractor.extract(frame),
        }
    }

    /// Scores one pair, reusing the cached features of `prev` when it has the
    /// index and pixels of the last `cur` passed in.
    pub fn score_pair(&mut self, prev: &Frame, cur: &Frame) -> MovementResult {
        let prev_features = self.cached_or_extract(prev);
        let cur_features = self.extractor.extract(cur);
        let result = self.score_features(prev, &prev_features, cur, &cur_features);
        self.previous = Some((cur.image.clone(), cur_features));
        result
    }

    /// Scores one pair from already extracted features. Never fails: every
    /// error is turned into a fallback or degraded result.
    pub fn score_features(
        &self,
        prev: &Frame,
        prev_features: &FrameFeatures,
        cur: &Frame,
        cur_features: &FrameFeatures,
    ) -> MovementResult {
        if prev.dimensions() != cur.dimensions() {
            warn!(
                "frame {} is {:?} but frame {} is {:?}, pair skipped",
                prev.index,
                prev.dimensions(),
                cur.index,
                cur.dimensions()
            );
            return MovementResult::degraded(cur.index);
        }

        let matches = self
            .matcher
            .match_descriptors(&prev_features.descriptors, &cur_features.descriptors);
        if matches.len() < self.config.min_match_count {
            debug!(
                "frame {}: {} good matches < {}, using frame difference",
                cur.index,
                matches.len(),
                self.config.min_match_count
            );
            return self.fallback(prev, cur, matches.len());
        }

        let (src, dst): (Vec<DVec2>, Vec<DVec2>) = matches
            .iter()
            .map(|m| {
                (
                    prev_features.keypoints[m.query_idx].p2d.as_dvec2(),
                    cur_features.keypoints[m.train_idx].p2d.as_dvec2(),
                )
            })
            .unzip();

        let homography = match self.estimator.estimate(&src, &dst) {
            Ok(h) => h,
            Err(e) => {
                debug!("frame {}: {}, using frame difference", cur.index, e);
                return self.fallback(prev, cur, matches.len());
            }
        };

        let motion = decompose(&homography.matrix);
        let score = movement_score(&motion, &self.config.weights);
        let detected = score > self.config.threshold_homography;
        let motion_type = if detected {
            classify(&motion, &self.config.classifier)
        } else {
            MotionType::Static
        };
        trace!(
            "frame {}: score {:.3}, {:?}, {} matches, inlier ratio {:.3}",
            cur.index,
            score,
            motion_type,
            matches.len(),
            homography.inlier_ratio()
        );
        MovementResult {
            frame_index: cur.index,
            score,
            detected,
            motion_type,
            method: DetectionMethod::Homography,
            match_count: matches.len(),
            inlier_ratio: Some(homography.inlier_ratio()),
            motion: Some(motion),
            homography: Some(homography.to_rows()),
            changed_fraction: None,
            flow_score: None,
            edge_score: None,
        }
    }

    fn fallback(&self, prev: &Frame, cur: &Frame, match_count: usize) -> MovementResult {
        let score = match diff_score(prev, cur) {
            Ok(s) => s,
            Err(e) => {
                warn!("frame {}: {}", cur.index, e);
                return MovementResult::degraded(cur.index);
            }
        };
        MovementResult {
            frame_index: cur.index,
            score,
            detected: score > self.config.threshold_feature,
            motion_type: MotionType::Unknown,
            method: DetectionMethod::Fallback,
            match_count,
            inlier_ratio: None,
            motion: None,
            homography: None,
            changed_fraction: changed_fraction(prev, cur, CHANGE_THRESHOLD).ok(),
            flow_score: optical_flow_score(prev, cur).ok(),
            edge_score: edge_motion_score(prev, cur).ok(),
        }
    }

    /// One result per consecutive pair, in sequence order.
    pub fn detect(&mut self, frames: &[Frame]) -> Vec<MovementResult> {
        self.detect_with_cancel(frames, &AtomicBool::new(false))
    }

    /// Like [`detect`](Self::detect) but stops between pairs once `cancel` is
    /// set, returning the results scored so far.
    pub fn detect_with_cancel(
        &mut self,
        frames: &[Frame],
        cancel: &AtomicBool,
    ) -> Vec<MovementResult> {
        self.reset();
        let mut results = Vec::with_capacity(frames.len().saturating_sub(1));
        for pair in frames.windows(2) {
            results.push(self.score_pair(&pair[0], &pair[1]));
            if cancel.load(Ordering::Relaxed) {
                info!(
                    "cancelled after {} of {} pairs",
                    results.len(),
                    frames.len() - 1
                );
                break;
            }
        }
        log_summary(&results);
        results
    }

    /// Scores all pairs on the rayon pool. Features are extracted once per
    /// frame; results come back in sequence order.
    pub fn detect_parallel(&self, frames: &[Frame]) -> Vec<MovementResult> {
        let features: Vec<FrameFeatures> = frames
            .par_iter()
            .map(|f| self.extractor.extract(f))
            .collect();
        let mut indexed: Vec<(usize, MovementResult)> = (1..frames.len())
            .into_par_iter()
            .map(|i| {
                (
                    i,
                    self.score_features(&frames[i - 1], &features[i - 1], &frames[i], &features[i]),
                )
            })
            .collect();
        indexed.sort_by_key(|(i, _)| *i);
        let results: Vec<MovementResult> = indexed.into_iter().map(|(_, r)| r).collect();
        log_summary(&results);
        results
    }
}

fn log_summary(results: &[MovementResult]) {
    let detected = results.iter().filter(|r| r.detected).count();
    let fallback = results
        .iter()
        .filter(|r| r.method == DetectionMethod::Fallback)
        .count();
    info!(
        "{} of {} pairs show camera movement ({} via frame difference)",
        detected,
        results.len(),
        fallback
    );
}
