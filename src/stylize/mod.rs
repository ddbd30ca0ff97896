//! Stylization passes around the generative model
//!
//! - **Pre-inference**: resize to the model size, blur, pseudo-erode,
//!   quantize, pack into a [-1, 1] tensor
//! - **Post-inference**: unpack to [0, 1], resize back to the region size
//!   with bilinear resampling

pub mod blur;
pub mod erosion;
pub mod tensor;

use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage};

use crate::error::InferenceError;
use crate::inference::Tensor;
use crate::params::StyleConfig;
use erosion::ErosionNoise;

/// Three-channel float raster with channel values in [0, 1].
pub type StyleImage = Rgb32FImage;

pub fn uniform_image(width: u32, height: u32, value: f32) -> StyleImage {
    StyleImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// Grayscale image with the same value replicated across all three channels.
pub fn gray_image_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> StyleImage {
    StyleImage::from_fn(width, height, |x, y| {
        let v = f(x, y);
        Rgb([v, v, v])
    })
}

/// Bilinear resize, channels clamped to [0, 1].
pub fn resize(image: &StyleImage, width: u32, height: u32) -> StyleImage {
    let mut out = imageops::resize(image, width, height, FilterType::Triangle);
    for px in out.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = c.clamp(0.0, 1.0);
        }
    }
    out
}

/// Mean over all channels of all pixels.
pub fn mean_brightness(image: &StyleImage) -> f32 {
    let raw = image.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let sum: f64 = raw.iter().map(|&c| c as f64).sum();
    (sum / raw.len() as f64) as f32
}

/// Brightest red channel value.
pub fn max_red(image: &StyleImage) -> f32 {
    image.pixels().map(|p| p[0]).fold(0.0f32, f32::max)
}

/// Runs both stylization passes with a fixed configuration.
pub struct Stylizer {
    config: StyleConfig,
    noise: ErosionNoise,
}

impl Stylizer {
    pub fn new(config: StyleConfig) -> Self {
        let noise = ErosionNoise::new(config.noise_seed, config.noise_period);
        Self { config, noise }
    }

    /// Resize, blur, pseudo-erode and quantize a region image.
    pub fn prepare(&self, image: &StyleImage, blur_strength: u32, erosion_strength: f32) -> StyleImage {
        let size = self.config.model_size;
        let resized = resize(image, size, size);
        let mut styled = blur::gaussian_blur(&resized, blur_strength);
        erosion::erode_and_quantize(
            &mut styled,
            &self.noise,
            self.config.noise_amplitude,
            erosion_strength,
            self.config.quantize_levels,
        );
        styled
    }

    /// Full pre-inference pass: `prepare` followed by tensor packing.
    pub fn to_input(&self, image: &StyleImage, blur_strength: u32, erosion_strength: f32) -> (StyleImage, Tensor) {
        let prepared = self.prepare(image, blur_strength, erosion_strength);
        let tensor = tensor::image_to_tensor(&prepared);
        (prepared, tensor)
    }

    /// Post-inference pass: unpack the model output and resize it to `range` x `range`.
    pub fn restore(&self, output: &Tensor, range: u32) -> Result<StyleImage, InferenceError> {
        let image = tensor::tensor_to_image(output)?;
        Ok(resize(&image, range, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hill(size: u32) -> StyleImage {
        let c = size as f32 / 2.0;
        gray_image_from_fn(size, size, |x, y| {
            let dx = (x as f32 - c) / c;
            let dy = (y as f32 - c) / c;
            (1.0 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0)
        })
    }

    #[test]
    fn test_resize_round_trip_preserves_mean() {
        for &range in &[97u32, 180, 400] {
            let img = hill(range);
            let there = resize(&img, 256, 256);
            let back = resize(&there, range, range);
            assert_eq!(back.dimensions(), (range, range));
            let before = mean_brightness(&img);
            let after = mean_brightness(&back);
            assert!(
                (before - after).abs() < 0.01,
                "range {}: mean {} -> {}",
                range,
                before,
                after
            );
        }
    }

    #[test]
    fn test_prepare_outputs_model_size_levels() {
        let stylizer = Stylizer::new(StyleConfig::default());
        let (prepared, tensor) = stylizer.to_input(&hill(120), 8, 100.0);
        assert_eq!(prepared.dimensions(), (256, 256));
        assert_eq!(tensor.shape(), [1, 256, 256, 3]);
        for px in prepared.pixels() {
            let level = px[0] * 5.0;
            assert!((level - level.round()).abs() < 1e-4);
        }
        for &v in tensor.data() {
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_restore_resizes_to_range() {
        let stylizer = Stylizer::new(StyleConfig::default());
        let t = Tensor::zeros([1, 256, 256, 3]);
        let restored = stylizer.restore(&t, 77).unwrap();
        assert_eq!(restored.dimensions(), (77, 77));
        assert!((restored.get_pixel(40, 40)[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_max_red() {
        let img = gray_image_from_fn(8, 8, |x, y| (x + y) as f32 / 14.0);
        assert!((max_red(&img) - 1.0).abs() < 1e-6);
        assert_eq!(max_red(&uniform_image(4, 4, 0.0)), 0.0);
    }
}
