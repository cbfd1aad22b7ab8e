use camera_motion_detect::io::{
    config_from_json, format_report, object_from_json, object_to_json, write_detailed_report,
    write_report,
};
use camera_motion_detect::{
    DetectionMethod, DetectorConfig, MotionError, MotionParameters, MotionType, MovementResult,
    MovementSummary,
};

fn result(frame_index: usize, score: f64, detected: bool, motion_type: MotionType) -> MovementResult {
    MovementResult {
        frame_index,
        score,
        detected,
        motion_type,
        method: DetectionMethod::Homography,
        match_count: 120,
        inlier_ratio: Some(0.9),
        motion: Some(MotionParameters::default()),
        homography: Some([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
        changed_fraction: None,
        flow_score: None,
        edge_score: None,
    }
}

fn sample_results() -> Vec<MovementResult> {
    let mut fallback = result(2, 7.5, true, MotionType::Unknown);
    fallback.method = DetectionMethod::Fallback;
    fallback.motion = None;
    fallback.inlier_ratio = None;
    fallback.homography = None;
    fallback.flow_score = Some(6.0);
    fallback.edge_score = Some(1.5);
    vec![
        result(1, 0.2, false, MotionType::Static),
        fallback,
        result(3, 31.0, true, MotionType::Translation),
        result(4, 40.0, true, MotionType::Translation),
        MovementResult::degraded(5),
    ]
}

#[test]
fn test_summary_counts() {
    let summary = MovementSummary::from_results(&sample_results(), 3);
    assert_eq!(summary.total_pairs, 5);
    assert_eq!(summary.detected_count, 3);
    assert!((summary.movement_percentage - 60.0).abs() < 1e-12);
    assert_eq!(summary.movement_frames, vec![2, 3, 4]);
    assert_eq!(summary.source_frames, vec![6, 9, 12]);
    assert_eq!(summary.homography_pairs, 3);
    assert_eq!(summary.fallback_pairs, 1);
    assert_eq!(summary.degraded_pairs, 1);
    assert_eq!(summary.max_score, 40.0);
    assert_eq!(summary.motion_types.get(&MotionType::Translation), Some(&2));
    assert_eq!(summary.motion_types.get(&MotionType::Static), None);
    assert_eq!(summary.dominant_motion(), Some(MotionType::Translation));
    assert!(summary.movement_detected());
}

#[test]
fn test_empty_summary() {
    let summary = MovementSummary::from_results(&[], 1);
    assert_eq!(summary.total_pairs, 0);
    assert_eq!(summary.movement_percentage, 0.0);
    assert!(!summary.movement_detected());
    assert_eq!(summary.dominant_motion(), None);
    assert!(format_report(&summary).contains("NO MOVEMENT DETECTED"));
}

#[test]
fn test_text_report() {
    let summary = MovementSummary::from_results(&sample_results(), 1);
    let text = format_report(&summary);
    assert!(text.contains("Total frame pairs analyzed: 5"));
    assert!(text.contains("Movement percentage: 60.0%"));
    assert!(text.contains("Frames with movement: 2, 3, 4"));
    assert!(text.contains("Translation: 2"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");
    write_report(path.to_str().unwrap(), &summary).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Status: MOVEMENT DETECTED"));
}

#[test]
fn test_detailed_report_is_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let results = sample_results();
    write_detailed_report(path.to_str().unwrap(), &DetectorConfig::default(), &results).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(value["generated"].is_string());
    assert_eq!(value["summary"]["detected_count"], 3);
    assert_eq!(value["config"]["threshold_homography"], 15.0);
    let parsed: Vec<MovementResult> = serde_json::from_value(value["results"].clone()).unwrap();
    assert_eq!(parsed.len(), results.len());
    for (p, r) in parsed.iter().zip(&results) {
        assert_eq!(p.frame_index, r.frame_index);
        assert_eq!(p.detected, r.detected);
        assert_eq!(p.method, r.method);
        assert_eq!(p.motion_type, r.motion_type);
        assert_eq!(p.motion.is_some(), r.motion.is_some());
        assert_eq!(p.homography.is_some(), r.homography.is_some());
        assert_eq!(p.flow_score, r.flow_score);
    }
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let path = path.to_str().unwrap();

    let config = DetectorConfig {
        threshold_homography: 22.0,
        cross_check: true,
        ..Default::default()
    };
    object_to_json(path, &config).unwrap();
    let loaded: DetectorConfig = object_from_json(path).unwrap();
    assert_eq!(loaded.threshold_homography, 22.0);
    assert!(loaded.cross_check);
    assert_eq!(loaded.min_match_count, config.min_match_count);
    assert_eq!(loaded.extractor.n_features, config.extractor.n_features);

    std::fs::write(path, r#"{"min_match_count": 12}"#).unwrap();
    let partial = config_from_json(path).unwrap();
    assert_eq!(partial.min_match_count, 12);
    assert_eq!(partial.threshold_feature, 5.0);

    std::fs::write(path, r#"{"min_match_count": 2}"#).unwrap();
    assert!(matches!(
        config_from_json(path),
        Err(MotionError::InvalidConfig(_))
    ));

    std::fs::write(path, "not json").unwrap();
    assert!(matches!(config_from_json(path), Err(MotionError::Json(_))));
}
