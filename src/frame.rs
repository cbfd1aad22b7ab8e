use image::{DynamicImage, GrayImage};

use crate::error::{MotionError, Result};

/// A decoded frame reduced to 8-bit luma, tagged with its position in the sequence.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: GrayImage,
}

impl Frame {
    pub fn new(index: usize, image: GrayImage) -> Frame {
        Frame { index, image }
    }

    /// Color frames are converted to luma.
    pub fn from_dynamic(index: usize, img: &DynamicImage) -> Frame {
        Frame {
            index,
            image: img.to_luma8(),
        }
    }

    /// Row-major 8-bit samples, `data.len()` must equal `width * height`.
    pub fn from_luma(index: usize, width: u32, height: u32, data: Vec<u8>) -> Result<Frame> {
        let len = data.len();
        let invalid = || {
            MotionError::InvalidFrame(format!(
                "{} bytes do not form a {}x{} luma image",
                len, width, height
            ))
        };
        if len != width as usize * height as usize {
            return Err(invalid());
        }
        GrayImage::from_raw(width, height, data)
            .map(|image| Frame { index, image })
            .ok_or_else(invalid)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Wraps decoded images into frames indexed by their position.
pub fn frames_from_images(images: &[DynamicImage]) -> Vec<Frame> {
    images
        .iter()
        .enumerate()
        .map(|(i, img)| Frame::from_dynamic(i, img))
        .collect()
}
