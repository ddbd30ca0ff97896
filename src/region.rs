//! Edit regions and the region extractor
//!
//! A `Region` is the square window of the heightmap touched by one commit.
//! Extraction stretches the heights inside it to a [0, 1] grayscale image.

use log::warn;

use crate::error::SculptError;
use crate::stylize::{self, StyleImage};
use crate::tilemap::Tilemap;

/// Gray level emitted for a region with no height variation.
pub const NEUTRAL_GRAY: f32 = 0.5;

/// A square window `[x_offset, x_offset+range) x [y_offset, y_offset+range)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x_offset: usize,
    pub y_offset: usize,
    pub range: usize,
}

impl Region {
    pub fn new(x_offset: usize, y_offset: usize, range: usize) -> Self {
        Self { x_offset, y_offset, range }
    }

    /// The whole `resolution` x `resolution` heightmap.
    pub fn full(resolution: usize) -> Self {
        Self::new(0, 0, resolution)
    }

    pub fn fits(&self, resolution: usize) -> bool {
        self.x_offset
            .checked_add(self.range)
            .is_some_and(|r| r <= resolution)
            && self
                .y_offset
                .checked_add(self.range)
                .is_some_and(|b| b <= resolution)
    }

    /// Check the window against a heightmap resolution. Done once per commit so
    /// per-cell offset arithmetic needs no further checks.
    pub fn validate(&self, resolution: usize) -> Result<(), SculptError> {
        if self.fits(resolution) {
            Ok(())
        } else {
            Err(SculptError::RegionOutOfBounds { region: *self, resolution })
        }
    }

    /// Copy this window out of a full-resolution grid.
    pub fn crop(&self, grid: &Tilemap<f32>) -> Result<Tilemap<f32>, SculptError> {
        if grid.width != grid.height {
            return Err(SculptError::GridMismatch {
                expected: grid.width,
                width: grid.width,
                height: grid.height,
            });
        }
        self.validate(grid.width)?;
        Ok(grid.sub_map(self.x_offset, self.y_offset, self.range, self.range))
    }
}

/// Result of extracting a region: the stretched image plus the height range
/// needed to map generated values back into heights.
#[derive(Clone, Debug)]
pub struct ExtractedRegion {
    pub region: Region,
    pub min_height: f32,
    pub max_height: f32,
    pub image: StyleImage,
}

/// Minimum and maximum height inside the region.
///
/// The accumulators start beyond any real value so the first cell always
/// updates both; a flat region therefore reports `min == max`.
pub fn height_range(heights: &Tilemap<f32>) -> (f32, f32) {
    let mut min_height = f32::MAX;
    let mut max_height = f32::MIN;
    for (_, _, &h) in heights.iter() {
        if h > max_height { max_height = h; }
        if h < min_height { min_height = h; }
    }
    (min_height, max_height)
}

/// Convert a region of `source` to a min/max stretched grayscale image.
///
/// A flat region yields a uniform `NEUTRAL_GRAY` image instead of dividing by zero.
pub fn extract_region(source: &Tilemap<f32>, region: Region) -> Result<ExtractedRegion, SculptError> {
    let heights = region.crop(source)?;
    let (min_height, max_height) = height_range(&heights);
    let span = max_height - min_height;

    let image = if span <= f32::EPSILON {
        warn!(
            "Region {:?} is flat (height {:.4}); using neutral gray",
            region, min_height
        );
        stylize::uniform_image(region.range as u32, region.range as u32, NEUTRAL_GRAY)
    } else {
        stylize::gray_image_from_fn(region.range as u32, region.range as u32, |x, y| {
            ((*heights.get(x as usize, y as usize) - min_height) / span).clamp(0.0, 1.0)
        })
    };

    Ok(ExtractedRegion {
        region,
        min_height,
        max_height,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_validation() {
        assert!(Region::new(0, 0, 513).validate(513).is_ok());
        assert!(Region::new(400, 10, 113).validate(513).is_ok());
        assert!(Region::new(400, 10, 114).validate(513).is_err());
        assert!(Region::new(usize::MAX, 0, 2).validate(513).is_err());
    }

    #[test]
    fn test_extract_stretches_to_unit_range() {
        let mut grid = Tilemap::new_with(8, 8, 0.2f32);
        grid.set(3, 3, 0.6);
        grid.set(4, 4, 0.4);

        let extracted = extract_region(&grid, Region::new(2, 2, 4)).unwrap();
        assert!((extracted.min_height - 0.2).abs() < 1e-6);
        assert!((extracted.max_height - 0.6).abs() < 1e-6);

        let px = extracted.image.get_pixel(1, 1);
        assert!((px[0] - 1.0).abs() < 1e-6);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert!((extracted.image.get_pixel(2, 2)[0] - 0.5).abs() < 1e-5);
        assert_eq!(extracted.image.get_pixel(0, 0)[0], 0.0);
    }

    #[test]
    fn test_flat_region_is_neutral_gray() {
        let grid = Tilemap::new_with(16, 16, 0.3f32);
        let extracted = extract_region(&grid, Region::new(4, 4, 8)).unwrap();
        assert_eq!(extracted.min_height, extracted.max_height);
        for px in extracted.image.pixels() {
            for &c in px.0.iter() {
                assert!(c.is_finite());
                assert_eq!(c, NEUTRAL_GRAY);
            }
        }
    }

    #[test]
    fn test_extract_rejects_out_of_bounds() {
        let grid = Tilemap::new_with(16, 16, 0.3f32);
        assert!(matches!(
            extract_region(&grid, Region::new(10, 0, 8)),
            Err(SculptError::RegionOutOfBounds { .. })
        ));
    }
}
