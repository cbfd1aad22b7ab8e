use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Parameters of the oriented FAST / rotated BRIEF extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Upper bound on keypoints kept over all pyramid levels.
    pub n_features: usize,
    /// FAST intensity threshold on 8-bit samples.
    pub fast_threshold: u8,
    pub n_levels: usize,
    pub scale_factor: f32,
    /// Sigma of the Gaussian applied before detection. 0 disables it.
    pub blur_sigma: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            n_features: 2000,
            fast_threshold: 20,
            n_levels: 8,
            scale_factor: 1.2,
            blur_sigma: 0.8,
        }
    }
}

/// Weights of the homography movement score.
///
/// `score = translation * |t| + rotation * |deg| + scale * scale_dev + perspective * p`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// per pixel of translation magnitude
    pub translation: f64,
    /// per degree of in-plane rotation
    pub rotation: f64,
    /// per unit of scale deviation from 1
    pub scale: f64,
    /// per unit of perspective magnitude
    pub perspective: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            translation: 1.5,
            rotation: 0.5,
            scale: 50.0,
            perspective: 1000.0,
        }
    }
}

/// Reference magnitudes used to normalize contributors before picking the
/// dominant motion type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Perspective magnitude above which the pair is `Perspective` outright.
    pub perspective_threshold: f64,
    pub translation_unit: f64,
    pub rotation_unit: f64,
    pub scale_unit: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            perspective_threshold: 5e-4,
            translation_unit: 10.0,
            rotation_unit: 1.0,
            scale_unit: 0.02,
        }
    }
}

/// Immutable detector configuration, validated once by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frame-difference threshold used on the fallback path.
    pub threshold_feature: f64,
    /// Movement-score threshold used on the homography path.
    pub threshold_homography: f64,
    pub min_match_count: usize,
    pub ratio_test_threshold: f32,
    pub ransac_reproj_threshold: f64,
    pub ransac_seed: u64,
    /// Keep only mutual nearest neighbours.
    pub cross_check: bool,
    /// Spacing of the frames handed to the detector in the source sequence.
    /// The detector itself never skips frames; the loader and the report use it.
    pub sample_rate: usize,
    pub extractor: ExtractorConfig,
    pub weights: ScoreWeights,
    pub classifier: ClassifierConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold_feature: 5.0,
            threshold_homography: 15.0,
            min_match_count: 8,
            ratio_test_threshold: 0.75,
            ransac_reproj_threshold: 3.0,
            ransac_seed: 0,
            cross_check: false,
            sample_rate: 1,
            extractor: ExtractorConfig::default(),
            weights: ScoreWeights::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

fn positive(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(MotionError::InvalidConfig(format!(
            "{} must be a positive finite number, got {}",
            name, v
        )))
    }
}

fn non_negative(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(MotionError::InvalidConfig(format!(
            "{} must be a non-negative finite number, got {}",
            name, v
        )))
    }
}

impl DetectorConfig {
    pub fn with_thresholds(threshold_feature: f64, threshold_homography: f64) -> Self {
        Self {
            threshold_feature,
            threshold_homography,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        positive("threshold_feature", self.threshold_feature)?;
        positive("threshold_homography", self.threshold_homography)?;
        if self.min_match_count < 4 {
            return Err(MotionError::InvalidConfig(format!(
                "min_match_count must be at least 4, got {}",
                self.min_match_count
            )));
        }
        let ratio = self.ratio_test_threshold as f64;
        if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
            return Err(MotionError::InvalidConfig(format!(
                "ratio_test_threshold must be in (0, 1], got {}",
                ratio
            )));
        }
        positive("ransac_reproj_threshold", self.ransac_reproj_threshold)?;
        if self.sample_rate == 0 {
            return Err(MotionError::InvalidConfig(
                "sample_rate must be at least 1".to_string(),
            ));
        }
        self.extractor.validate()?;

        non_negative("weights.translation", self.weights.translation)?;
        non_negative("weights.rotation", self.weights.rotation)?;
        non_negative("weights.scale", self.weights.scale)?;
        non_negative("weights.perspective", self.weights.perspective)?;

        positive(
            "classifier.perspective_threshold",
            self.classifier.perspective_threshold,
        )?;
        positive("classifier.translation_unit", self.classifier.translation_unit)?;
        positive("classifier.rotation_unit", self.classifier.rotation_unit)?;
        positive("classifier.scale_unit", self.classifier.scale_unit)?;
        Ok(())
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(MotionError::InvalidConfig(
                "extractor.n_features must be at least 1".to_string(),
            ));
        }
        if self.n_levels == 0 {
            return Err(MotionError::InvalidConfig(
                "extractor.n_levels must be at least 1".to_string(),
            ));
        }
        if !(self.scale_factor.is_finite() && self.scale_factor > 1.0) {
            return Err(MotionError::InvalidConfig(format!(
                "extractor.scale_factor must be greater than 1, got {}",
                self.scale_factor
            )));
        }
        non_negative("extractor.blur_sigma", self.blur_sigma as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DetectorConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{"min_match_count": 12, "extractor": {"n_levels": 2}}"#)
                .unwrap();
        assert_eq!(config.min_match_count, 12);
        assert_eq!(config.extractor.n_levels, 2);
        assert_eq!(config.extractor.n_features, 2000);
        assert_eq!(config.threshold_homography, 15.0);
    }
}
