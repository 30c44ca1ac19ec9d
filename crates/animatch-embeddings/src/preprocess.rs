//! Image preprocessing into `NCHW` float tensors.
//!
//! Semantic input: shorter side resized to the model resolution (bicubic),
//! center-cropped to a square, channels standardized with the CLIP
//! mean/std. Facial input: center square crop on the shorter dimension,
//! Lanczos resize to the face resolution, pixels mapped to `[-1, 1]`.

use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::errors::{EmbeddingError, Result};

/// Per-channel mean of the CLIP visual encoder.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// Per-channel standard deviation of the CLIP visual encoder.
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

/// A preprocessed single-image batch.
#[derive(Clone, Debug)]
pub struct InputTensor {
    /// `[1, 3, size, size]`.
    pub shape: [usize; 4],
    /// Row-major data matching `shape`.
    pub data: Vec<f32>,
}

fn ensure_non_empty(image: &RgbImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EmbeddingError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

/// Crop the largest centered square.
pub fn center_square(image: &RgbImage) -> Result<RgbImage> {
    ensure_non_empty(image)?;
    let side = image.width().min(image.height());
    let left = (image.width() - side) / 2;
    let top = (image.height() - side) / 2;
    Ok(imageops::crop_imm(image, left, top, side, side).to_image())
}

fn to_tensor(image: &RgbImage, pixel: impl Fn(usize, u8) -> f32) -> InputTensor {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let array = Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
        let rgb = image.get_pixel(x as u32, y as u32).0;
        pixel(c, rgb[c])
    });
    InputTensor {
        shape: [1, 3, h, w],
        data: array.iter().copied().collect(),
    }
}

/// Preprocess for the visual encoder.
pub fn semantic_input(image: &RgbImage, size: u32) -> Result<InputTensor> {
    ensure_non_empty(image)?;
    let (w, h) = (image.width(), image.height());
    let scale = f64::from(size) / f64::from(w.min(h));
    let new_w = ((f64::from(w) * scale).round() as u32).max(size);
    let new_h = ((f64::from(h) * scale).round() as u32).max(size);
    let resized = imageops::resize(image, new_w, new_h, FilterType::CatmullRom);
    let square = center_square(&resized)?;
    Ok(to_tensor(&square, |c, p| {
        (f32::from(p) / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c]
    }))
}

/// Preprocess for the face-recognition network.
pub fn facial_input(image: &RgbImage, size: u32) -> Result<InputTensor> {
    let square = center_square(image)?;
    let resized = imageops::resize(&square, size, size, FilterType::Lanczos3);
    Ok(to_tensor(&resized, |_, p| (f32::from(p) / 255.0 - 0.5) / 0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::Rgb;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(rgb))
    }

    #[test]
    fn center_square_uses_shorter_side() {
        let mut img = solid(30, 10, [0, 0, 0]);
        img.put_pixel(15, 5, Rgb([255, 0, 0]));
        let sq = center_square(&img).unwrap();
        assert_eq!(sq.dimensions(), (10, 10));
        assert_eq!(sq.get_pixel(5, 5).0, [255, 0, 0]);
    }

    #[test]
    fn center_square_rejects_empty() {
        let img = RgbImage::new(0, 5);
        assert_matches!(
            center_square(&img),
            Err(EmbeddingError::EmptyImage {
                width: 0,
                height: 5
            })
        );
    }

    #[test]
    fn facial_input_shape_and_range() {
        let t = facial_input(&solid(200, 150, [255, 0, 128]), 112).unwrap();
        assert_eq!(t.shape, [1, 3, 112, 112]);
        assert_eq!(t.data.len(), 3 * 112 * 112);
        // channel-major: first plane is red
        assert!((t.data[0] - 1.0).abs() < 1e-6);
        assert!((t.data[112 * 112] + 1.0).abs() < 1e-6);
        assert!(t.data.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn semantic_input_shape_and_standardization() {
        let t = semantic_input(&solid(320, 240, [0, 0, 0]), 224).unwrap();
        assert_eq!(t.shape, [1, 3, 224, 224]);
        let expected_red = -CLIP_MEAN[0] / CLIP_STD[0];
        assert!((t.data[0] - expected_red).abs() < 1e-5);
        let expected_blue = -CLIP_MEAN[2] / CLIP_STD[2];
        assert!((t.data[2 * 224 * 224] - expected_blue).abs() < 1e-5);
    }

    #[test]
    fn semantic_input_upscales_small_images() {
        let t = semantic_input(&solid(10, 20, [128, 128, 128]), 32).unwrap();
        assert_eq!(t.shape, [1, 3, 32, 32]);
    }
}
