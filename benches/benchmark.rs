use camera_motion_detect::features::FeatureExtractor;
use camera_motion_detect::matching::Matcher;
use camera_motion_detect::optimization::{HomographyEstimator, project};
use camera_motion_detect::synthetic::{SyntheticCamera, rotation_about};
use camera_motion_detect::{DetectorConfig, Frame, MovementScorer};
use criterion::{Criterion, criterion_group, criterion_main};
use glam::DVec2;
use nalgebra as na;
use std::hint::black_box;

fn frame_pair() -> (Frame, Frame) {
    let camera = SyntheticCamera::with_margin(640, 480, 120, 0);
    let (cx, cy) = camera.center();
    let a = Frame::new(0, camera.rest());
    let b = Frame::new(1, camera.view(&rotation_about(cx, cy, 3.0)).unwrap());
    (a, b)
}

fn bench_extract(c: &mut Criterion) {
    let (frame, _) = frame_pair();
    let extractor = FeatureExtractor::default();
    c.bench_function("extract_640x480", |b| {
        b.iter(|| extractor.extract(black_box(&frame)))
    });
}

fn bench_match(c: &mut Criterion) {
    let (a, b) = frame_pair();
    let extractor = FeatureExtractor::default();
    let fa = extractor.extract(&a);
    let fb = extractor.extract(&b);
    let matcher = Matcher::default();
    c.bench_function("match_descriptors", |bench| {
        bench.iter(|| matcher.match_descriptors(black_box(&fa.descriptors), black_box(&fb.descriptors)))
    });
}

fn bench_ransac(c: &mut Criterion) {
    let h = na::Matrix3::new(1.01, -0.05, 12.0, 0.04, 0.99, -4.0, 1e-5, -2e-5, 1.0);
    let src: Vec<DVec2> = (0..400)
        .map(|i| DVec2::new((i % 20) as f64 * 30.0, (i / 20) as f64 * 22.0))
        .collect();
    let dst: Vec<DVec2> = src
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let q = project(&h, p).unwrap();
            if i % 3 == 0 { q + DVec2::new(50.0, -40.0) } else { q }
        })
        .collect();
    let estimator = HomographyEstimator::default();
    c.bench_function("ransac_homography", |b| {
        b.iter(|| estimator.estimate(black_box(&src), black_box(&dst)))
    });
}

fn bench_score_pair(c: &mut Criterion) {
    let (a, b) = frame_pair();
    let scorer = MovementScorer::new(DetectorConfig::default()).unwrap();
    let fa = scorer.extractor().extract(&a);
    let fb = scorer.extractor().extract(&b);
    c.bench_function("score_features", |bench| {
        bench.iter(|| scorer.score_features(black_box(&a), &fa, black_box(&b), &fb))
    });
}

criterion_group!(benches, bench_extract, bench_match, bench_ransac, bench_score_pair);
criterion_main!(benches);
