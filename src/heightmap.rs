use serde::{Deserialize, Serialize};

use crate::brush::{flatten_rect, place_brush, BrushRect, GridPos};
use crate::error::SculptError;
use crate::tilemap::Tilemap;

// =============================================================================
// WORLD SPACE
// =============================================================================

/// A position or extent in world units. `y` is up.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPos {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

// =============================================================================
// TERRAIN STORE
// =============================================================================

/// The authoritative terrain heightmap: a square grid of normalized heights in
/// [0, 1] covering `size` world units, anchored at `position`.
pub trait HeightStore {
    /// Samples per side (typically 2^k + 1).
    fn resolution(&self) -> usize;

    /// World extents of the terrain (`y` is the height scale).
    fn size(&self) -> WorldPos;

    /// World position of the terrain origin corner.
    fn position(&self) -> WorldPos;

    /// Copy the `w` x `h` block whose top-left corner is `(x, y)`.
    fn get_heights(&self, x: usize, y: usize, w: usize, h: usize) -> Result<Tilemap<f32>, SculptError>;

    /// Write `heights` with its top-left corner at `(x, y)` in one call.
    fn set_heights(&mut self, x: usize, y: usize, heights: &Tilemap<f32>) -> Result<(), SculptError>;

    /// Map a world position onto fractional grid coordinates (x -> column, z -> row).
    fn world_to_grid(&self, world: WorldPos) -> GridPos {
        let pos = self.position();
        let size = self.size();
        let res = self.resolution() as f32;
        GridPos::new(
            (world.x - pos.x) / size.x * res,
            (world.z - pos.z) / size.z * res,
        )
    }

    /// Normalized height of the flat baseline `terrain_offset` world units up.
    fn baseline(&self, terrain_offset: f32) -> f32 {
        terrain_offset / self.size().y
    }

    /// Copy the whole heightmap.
    fn all_heights(&self) -> Result<Tilemap<f32>, SculptError> {
        let r = self.resolution();
        self.get_heights(0, 0, r, r)
    }

    /// Reset every cell to the flat baseline `terrain_offset / size.y`.
    fn clear_terrain(&mut self, terrain_offset: f32) -> Result<(), SculptError> {
        let r = self.resolution();
        let flat = Tilemap::new_with(r, r, self.baseline(terrain_offset));
        self.set_heights(0, 0, &flat)
    }

    /// Set every cell of the clamped brush rectangle around `world` (except its
    /// exact center) to the normalized `height`.
    fn flatten(&mut self, world: WorldPos, height: f32, brush_width: usize, brush_height: usize) -> Result<(), SculptError> {
        let rect = place_brush(self.world_to_grid(world), brush_width, brush_height, self.resolution());
        if rect.is_empty() {
            return Ok(());
        }
        let mut block = self.get_heights(rect.x, rect.y, rect.width, rect.height)?;
        flatten_rect(&mut block, BrushRect { x: 0, y: 0, ..rect }, height);
        self.set_heights(rect.x, rect.y, &block)
    }

    /// Interpolated normalized height under a world position.
    fn sample_height(&self, world: WorldPos) -> Result<f32, SculptError> {
        let grid = self.world_to_grid(world);
        let r = self.resolution();
        let x0 = grid.x.clamp(0.0, (r - 1) as f32).floor() as usize;
        let y0 = grid.y.clamp(0.0, (r - 1) as f32).floor() as usize;
        let w = (r - x0).min(2);
        let h = (r - y0).min(2);
        let block = self.get_heights(x0, y0, w, h)?;
        Ok(block.sample_bilinear(grid.x - x0 as f32, grid.y - y0 as f32))
    }

    /// Mean normalized height over the clamped brush rectangle around `world`.
    ///
    /// Falls back to the point sample if the rectangle is empty.
    fn sample_average_height(&self, world: WorldPos, brush_width: usize, brush_height: usize) -> Result<f32, SculptError> {
        let rect = place_brush(self.world_to_grid(world), brush_width, brush_height, self.resolution());
        if rect.is_empty() {
            return self.sample_height(world);
        }
        Ok(self.get_heights(rect.x, rect.y, rect.width, rect.height)?.mean())
    }
}

/// In-memory terrain store.
#[derive(Clone, Debug)]
pub struct TerrainData {
    position: WorldPos,
    size: WorldPos,
    heights: Tilemap<f32>,
}

impl TerrainData {
    /// A flat terrain at height 0.
    pub fn new(resolution: usize, size: WorldPos, position: WorldPos) -> Self {
        Self {
            position,
            size,
            heights: Tilemap::new_with(resolution, resolution, 0.0),
        }
    }

    /// Wrap an existing square heightmap.
    pub fn from_heights(heights: Tilemap<f32>, size: WorldPos, position: WorldPos) -> Result<Self, SculptError> {
        if heights.width != heights.height {
            return Err(SculptError::GridMismatch {
                expected: heights.width,
                width: heights.width,
                height: heights.height,
            });
        }
        Ok(Self { position, size, heights })
    }

    pub fn heights(&self) -> &Tilemap<f32> {
        &self.heights
    }

    fn check_rect(&self, x: usize, y: usize, w: usize, h: usize) -> Result<(), SculptError> {
        if self.heights.contains_rect(x, y, w, h) {
            Ok(())
        } else {
            Err(SculptError::RectOutOfBounds {
                x,
                y,
                width: w,
                height: h,
                resolution: self.heights.width,
            })
        }
    }
}

impl HeightStore for TerrainData {
    fn resolution(&self) -> usize {
        self.heights.width
    }

    fn size(&self) -> WorldPos {
        self.size
    }

    fn position(&self) -> WorldPos {
        self.position
    }

    fn get_heights(&self, x: usize, y: usize, w: usize, h: usize) -> Result<Tilemap<f32>, SculptError> {
        self.check_rect(x, y, w, h)?;
        Ok(self.heights.sub_map(x, y, w, h))
    }

    fn set_heights(&mut self, x: usize, y: usize, heights: &Tilemap<f32>) -> Result<(), SculptError> {
        self.check_rect(x, y, heights.width, heights.height)?;
        self.heights.blit(x, y, heights);
        Ok(())
    }
}
