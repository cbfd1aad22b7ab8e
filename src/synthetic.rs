//! Synthetic textured scenes and camera motions for tests, benches and the
//! sequence generator.

use image::{GrayImage, Luma};
use nalgebra as na;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cluttered scene of random rectangles and discs on a mid-gray background.
pub fn textured_scene(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut img = GrayImage::from_pixel(width, height, Luma([128]));
    let shapes = (width as usize * height as usize / 1200).max(8);
    for _ in 0..shapes {
        let value: u8 = rng.random_range(0..=255);
        let cx = rng.random_range(0..width) as i64;
        let cy = rng.random_range(0..height) as i64;
        if rng.random_bool(0.7) {
            let hw = rng.random_range(4..24) as i64;
            let hh = rng.random_range(4..24) as i64;
            fill(&mut img, value, |x, y| {
                (x - cx).abs() <= hw && (y - cy).abs() <= hh
            }, (cx - hw, cy - hh, cx + hw, cy + hh));
        } else {
            let r = rng.random_range(4..16) as i64;
            fill(&mut img, value, |x, y| {
                (x - cx).pow(2) + (y - cy).pow(2) <= r * r
            }, (cx - r, cy - r, cx + r, cy + r));
        }
    }
    img
}

fn fill<F: Fn(i64, i64) -> bool>(
    img: &mut GrayImage,
    value: u8,
    inside: F,
    (x0, y0, x1, y1): (i64, i64, i64, i64),
) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    for y in y0.max(0)..=y1.min(h - 1) {
        for x in x0.max(0)..=x1.min(w - 1) {
            if inside(x, y) {
                img.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
    }
}

pub fn translation(dx: f64, dy: f64) -> na::Matrix3<f64> {
    na::Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0)
}

/// Rotation by `degrees` about `(cx, cy)`, clockwise on screen.
pub fn rotation_about(cx: f64, cy: f64, degrees: f64) -> na::Matrix3<f64> {
    let (s, c) = degrees.to_radians().sin_cos();
    let r = na::Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0);
    translation(cx, cy) * r * translation(-cx, -cy)
}

pub fn zoom_about(cx: f64, cy: f64, scale: f64) -> na::Matrix3<f64> {
    let s = na::Matrix3::new(scale, 0.0, 0.0, 0.0, scale, 0.0, 0.0, 0.0, 1.0);
    translation(cx, cy) * s * translation(-cx, -cy)
}

fn bilinear(img: &GrayImage, x: f64, y: f64) -> u8 {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x > (w - 1) as f64 || y > (h - 1) as f64 {
        return 0;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let p = |xx: u32, yy: u32| img.get_pixel(xx, yy)[0] as f64;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

/// Renders a `width` x `height` view in which scene point `p` lands at `h * p`.
///
/// Pixels mapping outside the scene are black. Returns `None` for a singular `h`.
pub fn render_view(
    scene: &GrayImage,
    h: &na::Matrix3<f64>,
    width: u32,
    height: u32,
) -> Option<GrayImage> {
    let h_inv = h.try_inverse()?;
    Some(GrayImage::from_par_fn(width, height, |x, y| {
        let p = h_inv * na::Vector3::new(x as f64, y as f64, 1.0);
        if p.z.abs() < f64::EPSILON {
            return Luma([0]);
        }
        Luma([bilinear(scene, p.x / p.z, p.y / p.z)])
    }))
}

/// A camera looking at `scene` through a `width` x `height` window whose
/// top-left corner sits at `origin`; motions are applied in view coordinates.
pub struct SyntheticCamera {
    pub scene: GrayImage,
    pub width: u32,
    pub height: u32,
    pub origin: (f64, f64),
}

impl SyntheticCamera {
    pub fn new(scene: GrayImage, width: u32, height: u32) -> SyntheticCamera {
        let origin = (
            (scene.width().saturating_sub(width)) as f64 / 2.0,
            (scene.height().saturating_sub(height)) as f64 / 2.0,
        );
        SyntheticCamera {
            scene,
            width,
            height,
            origin,
        }
    }

    /// Scene with a `margin` pixel border around a `width` x `height` view.
    pub fn with_margin(width: u32, height: u32, margin: u32, seed: u64) -> SyntheticCamera {
        let scene = textured_scene(width + 2 * margin, height + 2 * margin, seed);
        SyntheticCamera::new(scene, width, height)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// View after applying `motion` (view coordinates) to the resting view.
    pub fn view(&self, motion: &na::Matrix3<f64>) -> Option<GrayImage> {
        let to_view = motion * translation(-self.origin.0, -self.origin.1);
        render_view(&self.scene, &to_view, self.width, self.height)
    }

    pub fn rest(&self) -> GrayImage {
        image::imageops::crop_imm(
            &self.scene,
            self.origin.0 as u32,
            self.origin.1 as u32,
            self.width,
            self.height,
        )
        .to_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_is_deterministic() {
        assert_eq!(textured_scene(64, 48, 3), textured_scene(64, 48, 3));
        assert_ne!(textured_scene(64, 48, 3), textured_scene(64, 48, 4));
    }

    #[test]
    fn integer_shift_copies_pixels() {
        let camera = SyntheticCamera::with_margin(80, 60, 30, 1);
        let rest = camera.rest();
        assert_eq!(camera.view(&na::Matrix3::identity()).unwrap(), rest);
        let shifted = camera.view(&translation(5.0, -3.0)).unwrap();
        for y in 10..50 {
            for x in 10..70 {
                assert_eq!(shifted.get_pixel(x + 5, y - 3), rest.get_pixel(x, y));
            }
        }
    }
}
