//! Brush footprint placement and falloff curves
//!
//! All footprints are axis-aligned rectangles in grid space that are clamped
//! to the heightmap before any cell is touched. Falloff uses the radial
//! distance from the rectangle center, normalized by half the brush width
//! and clamped to [0, 1].

use serde::{Deserialize, Serialize};

/// A fractional position in heightmap grid space (`x` = column, `y` = row).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: f32,
    pub y: f32,
}

impl GridPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A brush rectangle that is guaranteed to lie inside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Place a `width` x `height` brush centered on `center`.
///
/// The top-left corner is clamped to `[0, resolution]` and the size is then
/// truncated so the rectangle never extends past the last row or column.
pub fn place_brush(center: GridPos, width: usize, height: usize, resolution: usize) -> BrushRect {
    let x = (center.x - width as f32 / 2.0).clamp(0.0, resolution as f32) as usize;
    let y = (center.y - height as f32 / 2.0).clamp(0.0, resolution as f32) as usize;

    BrushRect {
        x,
        y,
        width: width.min(resolution - x),
        height: height.min(resolution - y),
    }
}

impl BrushRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Center of the footprint in local (rectangle) coordinates.
    pub fn local_center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Unclamped euclidean distance of a local cell from the footprint center.
    pub fn center_distance(&self, lx: usize, ly: usize) -> f32 {
        let (cx, cy) = self.local_center();
        let dx = lx as f32 - cx;
        let dy = ly as f32 - cy;
        (dx * dx + dy * dy).sqrt()
    }

    /// Distance from the center normalized by half the brush width, clamped to [0, 1].
    pub fn normalized_distance(&self, lx: usize, ly: usize) -> f32 {
        let half = self.width as f32 / 2.0;
        if half <= 0.0 {
            return 1.0;
        }
        (self.center_distance(lx, ly) / half).clamp(0.0, 1.0)
    }

    /// Iterate `(grid_x, grid_y, local_x, local_y)` over every covered cell.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize, usize)> + '_ {
        (0..self.height).flat_map(move |ly| {
            (0..self.width).map(move |lx| (self.x + lx, self.y + ly, lx, ly))
        })
    }
}

/// Raise target height (normalized): linear falloff.
pub fn raise_height(distance: f32, strength: f32, terrain_size_y: f32) -> f32 {
    (1.0 - distance) * strength / terrain_size_y
}

/// Raise blend confidence: quadratic falloff.
pub fn raise_alpha(distance: f32) -> f32 {
    (1.0 - distance * distance).clamp(0.0, 1.0)
}

/// Lower target height (normalized): cubic dig below the terrain baseline.
pub fn lower_height(distance: f32, strength: f32, terrain_offset: f32, terrain_size_y: f32) -> f32 {
    (terrain_offset - (1.0 - distance).powi(3) * strength) / terrain_size_y
}

/// Lower blend confidence: linear falloff.
pub fn lower_alpha(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_brush_inside() {
        let rect = place_brush(GridPos::new(100.0, 80.0), 40, 20, 513);
        assert_eq!(rect, BrushRect { x: 80, y: 70, width: 40, height: 20 });
    }

    #[test]
    fn test_place_brush_truncates_at_edges() {
        let rect = place_brush(GridPos::new(510.0, 2.0), 40, 40, 513);
        assert_eq!(rect.x, 490);
        assert_eq!(rect.y, 0);
        assert_eq!(rect.width, 23);
        assert_eq!(rect.height, 40);
        assert!(rect.x + rect.width <= 513);

        let off_grid = place_brush(GridPos::new(900.0, 900.0), 40, 40, 513);
        assert!(off_grid.is_empty());
    }

    #[test]
    fn test_normalized_distance_clamped() {
        let rect = BrushRect { x: 0, y: 0, width: 10, height: 10 };
        assert_eq!(rect.normalized_distance(5, 5), 0.0);
        assert!((rect.normalized_distance(5, 0) - 1.0).abs() < 1e-6);
        assert_eq!(rect.normalized_distance(0, 0), 1.0);
    }

    #[test]
    fn test_falloff_curves() {
        assert!((raise_height(0.0, 30.0, 600.0) - 0.05).abs() < 1e-6);
        assert_eq!(raise_height(1.0, 30.0, 600.0), 0.0);
        assert_eq!(raise_alpha(0.0), 1.0);
        assert!((raise_alpha(0.5) - 0.75).abs() < 1e-6);
        assert!((lower_height(0.0, 20.0, 50.0, 600.0) - 0.05).abs() < 1e-6);
        assert!((lower_height(1.0, 20.0, 50.0, 600.0) - 50.0 / 600.0).abs() < 1e-6);
        assert!((lower_alpha(0.25) - 0.75).abs() < 1e-6);
    }
}
