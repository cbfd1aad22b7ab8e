use camera_motion_detect::config::{DetectorConfig, ExtractorConfig};
use camera_motion_detect::{MotionError, MovementScorer};

fn assert_invalid(config: DetectorConfig) {
    match MovementScorer::new(config) {
        Err(MotionError::InvalidConfig(_)) => {}
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("config should have been rejected"),
    }
}

#[test]
fn test_default_config() {
    let config = DetectorConfig::default();
    assert_eq!(config.threshold_feature, 5.0);
    assert_eq!(config.threshold_homography, 15.0);
    assert_eq!(config.min_match_count, 8);
    assert_eq!(config.ratio_test_threshold, 0.75);
    assert_eq!(config.ransac_reproj_threshold, 3.0);
    assert_eq!(config.sample_rate, 1);
    assert_eq!(config.extractor.n_levels, 8);
    assert!(MovementScorer::new(config).is_ok());
}

#[test]
fn test_rejects_bad_thresholds() {
    assert_invalid(DetectorConfig::with_thresholds(-1.0, 15.0));
    assert_invalid(DetectorConfig::with_thresholds(5.0, 0.0));
    assert_invalid(DetectorConfig::with_thresholds(f64::NAN, 15.0));
}

#[test]
fn test_rejects_small_match_count() {
    assert_invalid(DetectorConfig {
        min_match_count: 3,
        ..Default::default()
    });
    assert!(
        MovementScorer::new(DetectorConfig {
            min_match_count: 4,
            ..Default::default()
        })
        .is_ok()
    );
}

#[test]
fn test_rejects_bad_ranges() {
    assert_invalid(DetectorConfig {
        ratio_test_threshold: 1.5,
        ..Default::default()
    });
    assert_invalid(DetectorConfig {
        ransac_reproj_threshold: 0.0,
        ..Default::default()
    });
    assert_invalid(DetectorConfig {
        sample_rate: 0,
        ..Default::default()
    });
    assert_invalid(DetectorConfig {
        extractor: ExtractorConfig {
            scale_factor: 1.0,
            ..Default::default()
        },
        ..Default::default()
    });
    assert_invalid(DetectorConfig {
        extractor: ExtractorConfig {
            n_levels: 0,
            ..Default::default()
        },
        ..Default::default()
    });
}

#[test]
fn test_rejects_negative_weight() {
    let mut config = DetectorConfig::default();
    config.weights.rotation = -0.5;
    assert_invalid(config);
}
