//! Camera movement detection for frame sequences.
//!
//! Consecutive frames are compared through oriented FAST / rotated BRIEF
//! features and a RANSAC homography. The homography is decomposed into
//! translation, rotation, scale and perspective components, scored, and the
//! dominant component names the motion type. Pairs without enough
//! correspondences fall back to a frame-difference score, with optical-flow
//! and edge-change scores reported alongside it.
//!
//! ```rust,ignore
//! use camera_motion_detect::{DetectorConfig, MovementScorer, frame::frames_from_images};
//!
//! let mut scorer = MovementScorer::new(DetectorConfig::default())?;
//! let results = scorer.detect(&frames_from_images(&images));
//! ```

pub mod config;
pub mod data_loader;
pub mod difference;
pub mod error;
pub mod features;
pub mod flow;
pub mod frame;
pub mod io;
pub mod matching;
pub mod motion;
pub mod optimization;
pub mod scoring;
pub mod summary;
pub mod synthetic;

pub use config::DetectorConfig;
pub use error::{MotionError, Result};
pub use frame::Frame;
pub use motion::MotionParameters;
pub use scoring::{DetectionMethod, MotionType, MovementResult, MovementScorer};
pub use summary::MovementSummary;
