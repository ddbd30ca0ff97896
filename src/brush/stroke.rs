//! Stroke accumulation buffers
//!
//! A `StrokeSession` owns the virtual heights and alpha mask for exactly one
//! stroke. It is created when the stroke begins and consumed by the commit,
//! so nothing accumulates across strokes.

use log::debug;

use super::geometry::{self, place_brush, BrushRect, GridPos};
use crate::params::TerrainKind;
use crate::region::Region;
use crate::tilemap::Tilemap;

/// Grid-space bounding box of the stroke path plus the largest brush margin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeBounds {
    pub min: GridPos,
    pub max: GridPos,
    pub radius: f32,
}

impl StrokeBounds {
    fn new(point: GridPos) -> Self {
        Self { min: point, max: point, radius: 0.0 }
    }

    fn include(&mut self, point: GridPos) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Square edit window covering the path and margin.
    ///
    /// The window keeps its full size near the grid edges and is shifted back
    /// inside instead; only a stroke wider than the grid is cut down to
    /// `resolution`. Returns `None` for an empty grid.
    pub fn to_region(&self, resolution: usize) -> Option<Region> {
        if resolution == 0 {
            return None;
        }
        let lo_x = (self.min.x - self.radius).floor();
        let lo_y = (self.min.y - self.radius).floor();
        let span_x = (self.max.x + self.radius).ceil() - lo_x;
        let span_y = (self.max.y + self.radius).ceil() - lo_y;

        let range = ((span_x.max(span_y) + 1.0).max(1.0) as usize).min(resolution);
        let x_offset = (lo_x.clamp(0.0, resolution as f32) as usize).min(resolution - range);
        let y_offset = (lo_y.clamp(0.0, resolution as f32) as usize).min(resolution - range);
        Some(Region::new(x_offset, y_offset, range))
    }
}

/// Per-stroke accumulation state.
#[derive(Clone, Debug)]
pub struct StrokeSession {
    kind: TerrainKind,
    resolution: usize,
    terrain_size_y: f32,
    terrain_offset: f32,
    virtual_heights: Tilemap<f32>,
    alpha_mask: Tilemap<f32>,
    bounds: Option<StrokeBounds>,
}

impl StrokeSession {
    /// Start a stroke on a `resolution` x `resolution` heightmap.
    ///
    /// Canyon strokes start from the terrain baseline (`terrain_offset /
    /// terrain_size_y`) so that `lower` has something to dig from; the other
    /// kinds start from zero.
    pub fn new(kind: TerrainKind, resolution: usize, terrain_size_y: f32, terrain_offset: f32) -> Self {
        let baseline = if kind.is_subtractive() {
            terrain_offset / terrain_size_y
        } else {
            0.0
        };
        debug!("Stroke started: {} on {}x{} grid", kind, resolution, resolution);
        Self {
            kind,
            resolution,
            terrain_size_y,
            terrain_offset,
            virtual_heights: Tilemap::new_with(resolution, resolution, baseline),
            alpha_mask: Tilemap::new_with(resolution, resolution, 0.0),
            bounds: None,
        }
    }

    pub fn kind(&self) -> TerrainKind {
        self.kind
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn virtual_heights(&self) -> &Tilemap<f32> {
        &self.virtual_heights
    }

    pub fn alpha_mask(&self) -> &Tilemap<f32> {
        &self.alpha_mask
    }

    pub fn bounds(&self) -> Option<StrokeBounds> {
        self.bounds
    }

    /// Record a stroke path point and grow the margin to at least `radius` cells.
    pub fn track(&mut self, point: GridPos, radius: f32) {
        let bounds = self.bounds.get_or_insert_with(|| StrokeBounds::new(point));
        bounds.include(point);
        if radius > bounds.radius {
            bounds.radius = radius;
        }
    }

    /// Edit window for the commit, or `None` if nothing was tracked.
    pub fn region(&self) -> Option<Region> {
        self.bounds.and_then(|b| b.to_region(self.resolution))
    }

    fn brush(&self, center: GridPos, width: usize, height: usize) -> Option<BrushRect> {
        let rect = place_brush(center, width, height, self.resolution);
        if rect.is_empty() { None } else { Some(rect) }
    }

    /// Raise the proposed surface under a radial brush. Never lowers a cell.
    pub fn raise(&mut self, center: GridPos, strength: f32, width: usize, height: usize) {
        let Some(rect) = self.brush(center, width, height) else { return };
        for (gx, gy, lx, ly) in rect.cells() {
            let d = rect.normalized_distance(lx, ly);
            raise_cell(
                &mut self.virtual_heights,
                &mut self.alpha_mask,
                (gx, gy),
                geometry::raise_height(d, strength, self.terrain_size_y),
                geometry::raise_alpha(d),
            );
        }
    }

    /// Lower the proposed surface under a radial brush. Never raises a cell.
    pub fn lower(&mut self, center: GridPos, strength: f32, width: usize, height: usize) {
        let Some(rect) = self.brush(center, width, height) else { return };
        for (gx, gy, lx, ly) in rect.cells() {
            let d = rect.normalized_distance(lx, ly);
            lower_cell(
                &mut self.virtual_heights,
                &mut self.alpha_mask,
                (gx, gy),
                geometry::lower_height(d, strength, self.terrain_offset, self.terrain_size_y),
                geometry::lower_alpha(d),
            );
        }
    }

    /// Overwrite the proposed surface under a rectangular brush with `target_height`.
    pub fn flatten(&mut self, center: GridPos, target_height: f32, width: usize, height: usize) {
        let Some(rect) = self.brush(center, width, height) else { return };
        flatten_rect(&mut self.virtual_heights, rect, target_height);
    }

    /// Fill the interior of a closed stroke by stamping small full-confidence
    /// footprints along the line from `start` to `end`. Every stamp is tracked,
    /// so the commit region always covers the filled interior.
    ///
    /// Height and lateral position are interpolated along the dominant axis, so
    /// a vertical line (equal `x`) steps in `y`. Coincident endpoints produce a
    /// single stamp at `start`.
    pub fn fill_between(
        &mut self,
        kind: TerrainKind,
        start: GridPos,
        end: GridPos,
        start_height: f32,
        end_height: f32,
        stamp_size: usize,
    ) {
        let (sx, sy) = (start.x.floor(), start.y.floor());
        let (ex, ey) = (end.x.floor(), end.y.floor());
        let dx = ex - sx;
        let dy = ey - sy;

        if dx == 0.0 && dy == 0.0 {
            self.stamp(kind, GridPos::new(sx, sy), start_height, stamp_size);
            return;
        }

        let steps = dx.abs().max(dy.abs()) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let point = if dx.abs() >= dy.abs() {
                let x = sx + dx.signum() * i as f32;
                GridPos::new(x, sy + (x - sx) / dx * dy)
            } else {
                let y = sy + dy.signum() * i as f32;
                GridPos::new(sx + (y - sy) / dy * dx, y)
            };
            let h = start_height + (end_height - start_height) * t;
            self.stamp(kind, point, h, stamp_size);
        }
    }

    fn stamp(&mut self, kind: TerrainKind, center: GridPos, strength: f32, size: usize) {
        let Some(rect) = self.brush(center, size, size) else { return };
        self.track(center, size as f32 / 2.0);
        for (gx, gy, lx, ly) in rect.cells() {
            let d = rect.normalized_distance(lx, ly);
            if kind.is_subtractive() {
                let target = geometry::lower_height(d, strength, self.terrain_offset, self.terrain_size_y);
                lower_cell(&mut self.virtual_heights, &mut self.alpha_mask, (gx, gy), target, 1.0);
            } else {
                let target = geometry::raise_height(d, strength, self.terrain_size_y);
                raise_cell(&mut self.virtual_heights, &mut self.alpha_mask, (gx, gy), target, 1.0);
            }
        }
    }

    /// Hand the accumulated buffers to the commit.
    pub fn into_parts(self) -> (Tilemap<f32>, Tilemap<f32>) {
        (self.virtual_heights, self.alpha_mask)
    }
}

fn raise_cell(heights: &mut Tilemap<f32>, alphas: &mut Tilemap<f32>, (x, y): (usize, usize), target: f32, alpha: f32) {
    let h = heights.get_mut(x, y);
    if *h < target { *h = target; }
    let a = alphas.get_mut(x, y);
    if *a < alpha { *a = alpha; }
}

fn lower_cell(heights: &mut Tilemap<f32>, alphas: &mut Tilemap<f32>, (x, y): (usize, usize), target: f32, alpha: f32) {
    let h = heights.get_mut(x, y);
    if *h > target { *h = target; }
    let a = alphas.get_mut(x, y);
    if *a < alpha { *a = alpha; }
}

/// Set every cell of `rect` except its exact center to `target_height`.
pub fn flatten_rect(grid: &mut Tilemap<f32>, rect: BrushRect, target_height: f32) {
    for (gx, gy, lx, ly) in rect.cells() {
        if rect.center_distance(lx, ly) > 0.0 {
            grid.set(gx, gy, target_height);
        }
    }
}
