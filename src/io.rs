use std::io::Write;

use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::config::DetectorConfig;
use crate::error::Result;
use crate::scoring::MovementResult;
use crate::summary::MovementSummary;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &str, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Loads and validates a detector configuration. Missing fields take defaults.
pub fn config_from_json(file_path: &str) -> Result<DetectorConfig> {
    let config: DetectorConfig = object_from_json(file_path)?;
    config.validate()?;
    Ok(config)
}

#[derive(serde::Serialize)]
struct DetailedReport<'a> {
    generated: String,
    config: &'a DetectorConfig,
    summary: &'a MovementSummary,
    results: &'a [MovementResult],
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_default()
}

/// Writes configuration, summary and every per-pair result as one JSON document.
pub fn write_detailed_report(
    output_path: &str,
    config: &DetectorConfig,
    results: &[MovementResult],
) -> Result<()> {
    let summary = MovementSummary::from_results(results, config.sample_rate);
    let report = DetailedReport {
        generated: timestamp(),
        config,
        summary: &summary,
        results,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(output_path, json)?;
    Ok(())
}

pub fn format_report(summary: &MovementSummary) -> String {
    let mut s = String::new();
    s += "# Camera Movement Detection Report\n";
    s += format!("Generated: {}\n\n", timestamp()).as_str();
    s += "## Summary\n";
    s += format!("Total frame pairs analyzed: {}\n", summary.total_pairs).as_str();
    s += format!("Movement detected frames: {}\n", summary.detected_count).as_str();
    s += format!("Movement percentage: {:.1}%\n", summary.movement_percentage).as_str();
    if summary.movement_detected() {
        s += "Status: MOVEMENT DETECTED\n\n";
        s += "## Movement Frames\n";
        let frames: Vec<String> = summary.source_frames.iter().map(|i| i.to_string()).collect();
        s += format!("Frames with movement: {}\n", frames.join(", ")).as_str();
        for (motion_type, count) in &summary.motion_types {
            s += format!("    {:?}: {}\n", motion_type, count).as_str();
        }
    } else {
        s += "Status: NO MOVEMENT DETECTED\n";
    }
    s += "\n## Method\n";
    s += format!("Homography pairs: {}\n", summary.homography_pairs).as_str();
    s += format!("Frame difference pairs: {}\n", summary.fallback_pairs).as_str();
    s += format!("Skipped pairs: {}\n", summary.degraded_pairs).as_str();
    s
}

pub fn write_report(output_path: &str, summary: &MovementSummary) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(format_report(summary).as_bytes())?;
    Ok(())
}
