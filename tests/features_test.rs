use camera_motion_detect::Frame;
use camera_motion_detect::features::{FeatureExtractor, MIN_KEYPOINTS};
use camera_motion_detect::matching::Matcher;
use camera_motion_detect::synthetic::textured_scene;
use image::{GrayImage, Luma};

fn textured_frame(index: usize) -> Frame {
    Frame::new(index, textured_scene(320, 240, 7))
}

#[test]
fn test_extract_textured_frame() {
    let extractor = FeatureExtractor::default();
    let features = extractor.extract(&textured_frame(3));
    assert!(features.len() >= 50, "only {} keypoints", features.len());
    assert_eq!(features.keypoints.len(), features.descriptors.len());
    assert_eq!(features.frame_index, 3);
    assert_eq!(features.img_w_h, (320, 240));
    for kp in &features.keypoints {
        assert!(kp.p2d.x >= 0.0 && kp.p2d.x < 320.0);
        assert!(kp.p2d.y >= 0.0 && kp.p2d.y < 240.0);
        assert!(kp.response > 0.0);
    }
    assert!(features.len() <= extractor.config().n_features);
}

#[test]
fn test_extract_is_repeatable() {
    let extractor = FeatureExtractor::default();
    let frame = textured_frame(0);
    let a = extractor.extract(&frame);
    let b = extractor.extract(&frame);
    assert_eq!(a.len(), b.len());
    assert_eq!(a.descriptors, b.descriptors);
    assert_eq!(a.keypoints, b.keypoints);
}

#[test]
fn test_blank_frame_has_no_features() {
    let extractor = FeatureExtractor::default();
    let frame = Frame::new(0, GrayImage::from_pixel(320, 240, Luma([90])));
    let features = extractor.extract(&frame);
    assert!(features.is_empty());
    assert!(features.descriptors.is_empty());
}

#[test]
fn test_few_corners_are_dropped() {
    // a single bright square gives at most four corners
    let mut img = GrayImage::from_pixel(200, 200, Luma([20]));
    for y in 90..110 {
        for x in 90..110 {
            img.put_pixel(x, y, Luma([230]));
        }
    }
    let features = FeatureExtractor::default().extract(&Frame::new(0, img));
    assert!(features.is_empty() || features.len() >= MIN_KEYPOINTS);
}

#[test]
fn test_tiny_frame_is_featureless() {
    let frame = Frame::new(0, textured_scene(24, 24, 1));
    assert!(FeatureExtractor::default().extract(&frame).is_empty());
}

#[test]
fn test_identical_frames_match_exactly() {
    let extractor = FeatureExtractor::default();
    let frame = textured_frame(0);
    let features = extractor.extract(&frame);
    let matches = Matcher::default().match_descriptors(&features.descriptors, &features.descriptors);
    assert!(matches.len() >= 20, "only {} matches", matches.len());
    for m in &matches {
        assert_eq!(m.distance, 0);
        assert_eq!(m.query_idx, m.train_idx);
    }
}

#[test]
fn test_cross_check_is_subset() {
    let extractor = FeatureExtractor::default();
    let a = extractor.extract(&Frame::new(0, textured_scene(320, 240, 7)));
    let b = extractor.extract(&Frame::new(1, textured_scene(320, 240, 8)));
    let plain = Matcher::new(0.9, false).match_descriptors(&a.descriptors, &b.descriptors);
    let checked = Matcher::new(0.9, true).match_descriptors(&a.descriptors, &b.descriptors);
    assert!(checked.len() <= plain.len());
    assert!(checked.iter().all(|m| plain.contains(m)));
    assert!(checked.windows(2).all(|w| w[0].distance <= w[1].distance));
}
