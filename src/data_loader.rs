use std::path::{Path, PathBuf};

use glob::glob;
use image::ImageReader;
use indicatif::ParallelProgressIterator;
use log::{trace, warn};
use rayon::prelude::*;

use crate::error::{MotionError, Result};
use crate::frame::Frame;

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        let lower = p.as_os_str().to_string_lossy().to_lowercase();
        for ext in &[".png", ".jpg", ".jpeg"] {
            if lower.ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

fn decode_luma(path: &Path) -> Result<image::GrayImage> {
    Ok(ImageReader::open(path)?.decode()?.to_luma8())
}

/// Sorted image paths in `folder`, every `sample_rate`-th one starting at `start_idx`.
pub fn list_images(folder: &str, start_idx: usize, sample_rate: usize) -> Result<Vec<PathBuf>> {
    if sample_rate == 0 {
        return Err(MotionError::InvalidConfig(
            "sample_rate must be at least 1".to_string(),
        ));
    }
    if !Path::new(folder).is_dir() {
        return Err(MotionError::NoFrames(format!("{} is not a directory", folder)));
    }
    let mut sorted_path: Vec<PathBuf> = glob(format!("{}/*", folder).as_str())?
        .filter_map(img_filter)
        .collect();
    sorted_path.sort();
    Ok(sorted_path
        .into_iter()
        .skip(start_idx)
        .step_by(sample_rate)
        .collect())
}

/// Loads a folder of images as an ordered frame sequence.
///
/// Images are decoded in parallel with a progress bar. Frame `i` of the result
/// is source image `start_idx + i * sample_rate`. Unreadable files are skipped
/// with a warning; the remaining frames are re-indexed contiguously.
pub fn load_frames(folder: &str, start_idx: usize, sample_rate: usize) -> Result<Vec<Frame>> {
    let paths = list_images(folder, start_idx, sample_rate)?;
    if paths.is_empty() {
        return Err(MotionError::NoFrames(format!("no png/jpg images in {}", folder)));
    }
    trace!("loading {} images from {}", paths.len(), folder);
    let decoded: Vec<Option<image::GrayImage>> = paths
        .par_iter()
        .progress_count(paths.len() as u64)
        .map(|path| match decode_luma(path) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    let frames: Vec<Frame> = decoded
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, img)| Frame::new(i, img))
        .collect();
    if frames.is_empty() {
        return Err(MotionError::NoFrames(format!("no decodable images in {}", folder)));
    }
    Ok(frames)
}
