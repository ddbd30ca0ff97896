//! Compositor: merges a generated patch back into the heightmap
//!
//! The restored model output is re-expanded from image space into heights
//! using the extracted region's min/max, blended against the original heights
//! by the stroke alpha, and combined with a sign rule per terrain kind:
//!
//! - Mountain, Glacier: `max(original, candidate)`, never lowers the surface
//! - Canyon: `min(original, candidate)`, never raises it

use log::warn;

use crate::error::SculptError;
use crate::params::TerrainKind;
use crate::stylize::{self, StyleImage};
use crate::tilemap::Tilemap;

/// Output of one composite pass.
#[derive(Clone, Debug)]
pub struct Composite {
    pub heights: Tilemap<f32>,
    /// Brightest red value in the generated image
    pub max_color: f32,
    pub cells_changed: usize,
    /// True when the generated image was unusable and the original was kept
    pub skipped: bool,
}

/// Height range of the extracted region plus the baseline offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightFrame {
    pub min_height: f32,
    pub max_height: f32,
    /// `terrain_offset / terrain_size_y`
    pub baseline: f32,
}

/// `a + (b - a) * t` with `t` clamped to [0, 1].
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Height proposed by the generated image before the sign rule is applied.
pub fn candidate_height(kind: TerrainKind, color: f32, frame: HeightFrame, original: f32, alpha: f32) -> f32 {
    let generated = if kind.is_subtractive() {
        color * frame.baseline
    } else {
        color * (frame.max_height - frame.min_height) + frame.min_height + frame.baseline
    };
    lerp(generated, original, 1.0 - alpha.clamp(0.0, 1.0))
}

/// Combine a candidate with the original height under the kind's sign rule.
pub fn combine(kind: TerrainKind, original: f32, candidate: f32) -> f32 {
    let h = if kind.is_subtractive() {
        original.min(candidate)
    } else {
        original.max(candidate)
    };
    h.clamp(0.0, 1.0)
}

/// Merge `generated` (already resized to the region) into `original`.
///
/// `original` and `alpha` are the region's heights and stroke alpha, both
/// `range` x `range`. Returns the new region heights; nothing is written here.
pub fn composite(
    generated: &StyleImage,
    original: &Tilemap<f32>,
    alpha: &Tilemap<f32>,
    frame: HeightFrame,
    kind: TerrainKind,
) -> Result<Composite, SculptError> {
    let (w, h) = (original.width, original.height);
    for (gw, gh) in [(generated.width() as usize, generated.height() as usize), (alpha.width, alpha.height)] {
        if (gw, gh) != (w, h) {
            return Err(SculptError::GridMismatch { expected: w, width: gw, height: gh });
        }
    }

    let max_color = stylize::max_red(generated);
    if !max_color.is_finite() || max_color <= 0.0 {
        warn!("Generated image is black (max color {}); region left unmodified", max_color);
        return Ok(Composite {
            heights: original.clone(),
            max_color,
            cells_changed: 0,
            skipped: true,
        });
    }

    let mut heights = original.clone();
    let mut cells_changed = 0;
    for (x, y, cell) in heights.iter_mut() {
        let before = *cell;
        let color = (generated.get_pixel(x as u32, y as u32)[0] / max_color).clamp(0.0, 1.0);
        let candidate = candidate_height(kind, color, frame, before, *alpha.get(x, y));
        let after = combine(kind, before, candidate);
        if after != before {
            cells_changed += 1;
        }
        *cell = after;
    }

    Ok(Composite {
        heights,
        max_color,
        cells_changed,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylize::{gray_image_from_fn, uniform_image};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const N: usize = 32;

    fn frame() -> HeightFrame {
        HeightFrame { min_height: 0.1, max_height: 0.6, baseline: 50.0 / 600.0 }
    }

    fn random_grid(rng: &mut ChaCha8Rng) -> Tilemap<f32> {
        let mut grid = Tilemap::new_with(N, N, 0.0f32);
        for (_, _, v) in grid.iter_mut() {
            *v = rng.gen_range(0.0..1.0);
        }
        grid
    }

    fn random_image(rng: &mut ChaCha8Rng) -> StyleImage {
        let values: Vec<f32> = (0..N * N).map(|_| rng.gen_range(0.0..1.0)).collect();
        gray_image_from_fn(N as u32, N as u32, |x, y| values[y as usize * N + x as usize])
    }

    #[test]
    fn test_additive_kinds_never_lower() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for kind in [TerrainKind::Mountain, TerrainKind::Glacier] {
            for _ in 0..10 {
                let original = random_grid(&mut rng);
                let alpha = random_grid(&mut rng);
                let out = composite(&random_image(&mut rng), &original, &alpha, frame(), kind).unwrap();
                for (x, y, &h) in out.heights.iter() {
                    assert!(h >= *original.get(x, y), "{} lowered ({}, {})", kind, x, y);
                }
            }
        }
    }

    #[test]
    fn test_canyon_never_raises() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..10 {
            let original = random_grid(&mut rng);
            let alpha = random_grid(&mut rng);
            let out = composite(&random_image(&mut rng), &original, &alpha, frame(), TerrainKind::Canyon).unwrap();
            for (x, y, &h) in out.heights.iter() {
                assert!(h <= *original.get(x, y));
            }
        }
    }

    #[test]
    fn test_zero_alpha_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let original = random_grid(&mut rng);
        let alpha = Tilemap::new_with(N, N, 0.0f32);
        for &kind in TerrainKind::all() {
            let out = composite(&random_image(&mut rng), &original, &alpha, frame(), kind).unwrap();
            assert_eq!(out.heights, original);
            assert_eq!(out.cells_changed, 0);
        }
    }

    #[test]
    fn test_black_image_is_skipped() {
        let original = Tilemap::new_with(N, N, 0.2f32);
        let alpha = Tilemap::new_with(N, N, 1.0f32);
        let out = composite(&uniform_image(N as u32, N as u32, 0.0), &original, &alpha, frame(), TerrainKind::Mountain)
            .unwrap();
        assert!(out.skipped);
        assert_eq!(out.heights, original);
    }

    #[test]
    fn test_full_alpha_mountain_reaches_generated_height() {
        let original = Tilemap::new_with(N, N, 0.0f32);
        let alpha = Tilemap::new_with(N, N, 1.0f32);
        let image = uniform_image(N as u32, N as u32, 0.5);
        let out = composite(&image, &original, &alpha, frame(), TerrainKind::Mountain).unwrap();
        let f = frame();
        let expected = f.max_height + f.baseline;
        assert!((*out.heights.get(4, 4) - expected).abs() < 1e-6);
        assert_eq!(out.cells_changed, N * N);
    }

    #[test]
    fn test_mismatched_sizes_rejected() {
        let original = Tilemap::new_with(N, N, 0.2f32);
        let alpha = Tilemap::new_with(N - 1, N, 1.0f32);
        let image = uniform_image(N as u32, N as u32, 0.5);
        assert!(composite(&image, &original, &alpha, frame(), TerrainKind::Glacier).is_err());
    }
}
