//! Pseudo-erosion: smooth-noise brightness modulation followed by
//! quantization into a few flat terraces.

use noise::{NoiseFn, Perlin};

use super::StyleImage;

/// Deterministic smooth 2D noise in [0, 1], sampled at pixel / period.
pub struct ErosionNoise {
    perlin: Perlin,
    period: f64,
}

impl ErosionNoise {
    pub fn new(seed: u32, period: f64) -> Self {
        Self {
            perlin: Perlin::new(seed),
            period: period.max(f64::EPSILON),
        }
    }

    pub fn sample(&self, x: u32, y: u32) -> f32 {
        let n = self.perlin.get([x as f64 / self.period, y as f64 / self.period]);
        (((n + 1.0) * 0.5) as f32).clamp(0.0, 1.0)
    }
}

/// Snap a channel value to `levels` discrete steps: `floor(c * levels) / levels`.
pub fn quantize(value: f32, levels: u32) -> f32 {
    if levels == 0 {
        return value;
    }
    let levels = levels as f32;
    (value * levels).floor() / levels
}

/// Modulate every channel by `1 + noise * amplitude * strength / 100`, clamp to
/// [0, 1] and quantize.
pub fn erode_and_quantize(
    image: &mut StyleImage,
    noise: &ErosionNoise,
    amplitude: f32,
    erosion_strength: f32,
    levels: u32,
) {
    let strength = erosion_strength.clamp(0.0, 100.0) / 100.0;
    for (x, y, px) in image.enumerate_pixels_mut() {
        let gain = 1.0 + noise.sample(x, y) * amplitude * strength;
        for c in px.0.iter_mut() {
            *c = quantize((*c * gain).clamp(0.0, 1.0), levels);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylize::uniform_image;

    #[test]
    fn test_quantize_five_levels() {
        assert_eq!(quantize(0.83, 5), 0.8);
        assert_eq!(quantize(0.0, 5), 0.0);
        assert_eq!(quantize(0.19, 5), 0.0);
        assert_eq!(quantize(1.0, 5), 1.0);
        assert_eq!(quantize(0.4, 0), 0.4);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let a = ErosionNoise::new(3, 25.0);
        let b = ErosionNoise::new(3, 25.0);
        for y in (0..256).step_by(17) {
            for x in (0..256).step_by(13) {
                let v = a.sample(x, y);
                assert!((0.0..=1.0).contains(&v));
                assert_eq!(v, b.sample(x, y));
            }
        }
    }

    #[test]
    fn test_zero_strength_only_quantizes() {
        let mut img = uniform_image(32, 32, 0.83);
        let noise = ErosionNoise::new(0, 25.0);
        erode_and_quantize(&mut img, &noise, 0.4, 0.0, 5);
        for px in img.pixels() {
            assert_eq!(px[0], 0.8);
        }
    }

    #[test]
    fn test_full_strength_never_darkens() {
        let mut img = uniform_image(64, 64, 0.5);
        let noise = ErosionNoise::new(0, 25.0);
        erode_and_quantize(&mut img, &noise, 0.4, 100.0, 5);
        for px in img.pixels() {
            assert!(px[0] >= 0.4 && px[0] <= 0.6);
            assert_eq!(px[0], quantize(px[0], 5));
        }
    }
}
