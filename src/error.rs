use thiserror::Error;

/// Errors produced by the movement detection pipeline.
#[derive(Error, Debug)]
pub enum MotionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: (u32, u32), got: (u32, u32) },

    #[error("Degenerate point configuration: {0}")]
    DegenerateConfiguration(String),

    #[error("Not enough correspondences: need at least {required}, got {got}")]
    InsufficientPoints { required: usize, got: usize },

    #[error("Point sets differ in length: {left} vs {right}")]
    PointCountMismatch { left: usize, right: usize },

    #[error("Invalid frame buffer: {0}")]
    InvalidFrame(String),

    #[error("No frames found: {0}")]
    NoFrames(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, MotionError>;
