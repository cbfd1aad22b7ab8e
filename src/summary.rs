use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::{DetectionMethod, MotionType, MovementResult};

/// Sequence-level view of the per-pair results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSummary {
    pub total_pairs: usize,
    pub detected_count: usize,
    /// Percentage of pairs with movement, 0..=100.
    pub movement_percentage: f64,
    /// Frame indices (as seen by the detector) where movement was detected.
    pub movement_frames: Vec<usize>,
    /// `movement_frames` mapped back to the unsampled source sequence.
    pub source_frames: Vec<usize>,
    pub sample_rate: usize,
    pub motion_types: BTreeMap<MotionType, usize>,
    pub homography_pairs: usize,
    pub fallback_pairs: usize,
    pub degraded_pairs: usize,
    pub max_score: f64,
}

impl MovementSummary {
    pub fn from_results(results: &[MovementResult], sample_rate: usize) -> MovementSummary {
        let sample_rate = sample_rate.max(1);
        let movement_frames: Vec<usize> = results
            .iter()
            .filter(|r| r.detected)
            .map(|r| r.frame_index)
            .collect();
        let mut motion_types = BTreeMap::new();
        for r in results.iter().filter(|r| r.detected) {
            *motion_types.entry(r.motion_type).or_insert(0) += 1;
        }
        let count_method = |m: DetectionMethod| results.iter().filter(|r| r.method == m).count();
        let movement_percentage = if results.is_empty() {
            0.0
        } else {
            movement_frames.len() as f64 * 100.0 / results.len() as f64
        };
        MovementSummary {
            total_pairs: results.len(),
            detected_count: movement_frames.len(),
            movement_percentage,
            source_frames: movement_frames.iter().map(|i| i * sample_rate).collect(),
            movement_frames,
            sample_rate,
            motion_types,
            homography_pairs: count_method(DetectionMethod::Homography),
            fallback_pairs: count_method(DetectionMethod::Fallback),
            degraded_pairs: count_method(DetectionMethod::Degraded),
            max_score: results.iter().map(|r| r.score).fold(0.0, f64::max),
        }
    }

    pub fn movement_detected(&self) -> bool {
        self.detected_count > 0
    }

    /// Motion type seen most often among detected pairs.
    pub fn dominant_motion(&self) -> Option<MotionType> {
        self.motion_types
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(t, _)| *t)
    }
}
