use camera_motion_detect::data_loader::load_frames;
use camera_motion_detect::io::{config_from_json, format_report, write_detailed_report, write_report};
use camera_motion_detect::{DetectorConfig, MovementScorer, MovementSummary};
use clap::Parser;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct CamDetectCli {
    /// path to image folder, frames are taken in file name order
    path: String,

    /// detector config json, command line thresholds override it
    #[arg(long)]
    config: Option<String>,

    /// analyse every n-th image
    #[arg(long)]
    sample_rate: Option<usize>,

    #[arg(long, default_value = "0")]
    start_idx: usize,

    /// frame difference threshold for pairs without enough matches
    #[arg(long)]
    threshold_feature: Option<f64>,

    /// movement score threshold for the homography path
    #[arg(long)]
    threshold_homography: Option<f64>,

    #[arg(long)]
    min_match_count: Option<usize>,

    /// score pairs in parallel
    #[arg(long, action)]
    parallel: bool,

    /// write per-pair results as json
    #[arg(short, long)]
    output_json: Option<String>,

    /// write a text summary
    #[arg(short, long)]
    report: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = CamDetectCli::parse();

    let mut config = match &cli.config {
        Some(path) => config_from_json(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(v) = cli.sample_rate {
        config.sample_rate = v;
    }
    if let Some(v) = cli.threshold_feature {
        config.threshold_feature = v;
    }
    if let Some(v) = cli.threshold_homography {
        config.threshold_homography = v;
    }
    if let Some(v) = cli.min_match_count {
        config.min_match_count = v;
    }
    let mut scorer = MovementScorer::new(config)?;

    let now = Instant::now();
    let frames = load_frames(&cli.path, cli.start_idx, scorer.config().sample_rate)?;
    println!(
        "loading {} frames took {:.6} sec",
        frames.len(),
        now.elapsed().as_secs_f64()
    );

    let now = Instant::now();
    let results = if cli.parallel {
        scorer.detect_parallel(&frames)
    } else {
        scorer.detect(&frames)
    };
    let duration_sec = now.elapsed().as_secs_f64();
    println!("scoring {} pairs took {:.6} sec", results.len(), duration_sec);

    for r in results.iter().filter(|r| r.detected) {
        println!(
            "frame {:>5}  score {:>9.3}  {:?} via {:?}",
            r.frame_index, r.score, r.motion_type, r.method
        );
    }

    let summary = MovementSummary::from_results(&results, scorer.config().sample_rate);
    println!("{}", format_report(&summary));
    if let Some(path) = &cli.output_json {
        write_detailed_report(path, scorer.config(), &results)?;
    }
    if let Some(path) = &cli.report {
        write_report(path, &summary)?;
    }
    Ok(())
}
