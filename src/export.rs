//! PNG import/export for heightmaps and per-commit snapshots
//!
//! Heightmaps round-trip through 16-bit grayscale PNGs. Style images and alpha
//! masks are written as 8-bit snapshots for inspection only.

use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::error::SculptError;
use crate::stylize::StyleImage;
use crate::tilemap::Tilemap;

// =============================================================================
// HEIGHTMAP I/O
// =============================================================================

/// Save normalized heights as a 16-bit grayscale PNG.
pub fn save_heightmap_png(heights: &Tilemap<f32>, path: &Path) -> Result<(), SculptError> {
    let img: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(heights.width as u32, heights.height as u32, |x, y| {
            let v = heights.get(x as usize, y as usize).clamp(0.0, 1.0);
            Luma([(v * u16::MAX as f32).round() as u16])
        });
    img.save(path)?;
    Ok(())
}

/// Load a grayscale PNG (8 or 16 bit) as normalized heights.
pub fn load_heightmap_png(path: &Path) -> Result<Tilemap<f32>, SculptError> {
    let img = image::open(path)?.into_luma16();
    let (w, h) = img.dimensions();
    let data: Vec<f32> = img
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / u16::MAX as f32)
        .collect();
    Tilemap::from_vec(w as usize, h as usize, data).ok_or(SculptError::GridMismatch {
        expected: w as usize,
        width: w as usize,
        height: h as usize,
    })
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 8-bit copy of a float style image.
pub fn render_style_image(image: &StyleImage) -> RgbImage {
    ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Rgb([to_u8(p[0]), to_u8(p[1]), to_u8(p[2])])
    })
}

/// Alpha mask as grayscale (0 = untouched, 255 = full confidence).
pub fn render_mask(mask: &Tilemap<f32>) -> GrayImage {
    ImageBuffer::from_fn(mask.width as u32, mask.height as u32, |x, y| {
        Luma([to_u8(*mask.get(x as usize, y as usize))])
    })
}

pub fn save_style_image(image: &StyleImage, path: &Path) -> Result<(), SculptError> {
    render_style_image(image).save(path)?;
    Ok(())
}

pub fn save_mask(mask: &Tilemap<f32>, path: &Path) -> Result<(), SculptError> {
    render_mask(mask).save(path)?;
    Ok(())
}

// =============================================================================
// PREVIEWS
// =============================================================================

/// Lambert hillshade, light from the northwest.
pub fn render_hillshade(heights: &Tilemap<f32>, height_scale: f32) -> RgbImage {
    let light = normalize_vec3(-1.0, -1.0, 2.0);
    ImageBuffer::from_fn(heights.width as u32, heights.height as u32, |x, y| {
        let n = surface_normal(heights, x as usize, y as usize, height_scale);
        let diffuse = (n[0] * light[0] + n[1] * light[1] + n[2] * light[2]).max(0.0);
        let shade = 0.35 + 0.65 * diffuse;
        let base = 90.0 + 140.0 * heights.get(x as usize, y as usize).clamp(0.0, 1.0);
        let v = (base * shade).clamp(0.0, 255.0) as u8;
        Rgb([v, v, v])
    })
}

fn surface_normal(heights: &Tilemap<f32>, x: usize, y: usize, height_scale: f32) -> [f32; 3] {
    let x_left = x.saturating_sub(1);
    let x_right = (x + 1).min(heights.width - 1);
    let y_up = y.saturating_sub(1);
    let y_down = (y + 1).min(heights.height - 1);

    let dx = (*heights.get(x_right, y) - *heights.get(x_left, y)) * height_scale;
    let dy = (*heights.get(x, y_down) - *heights.get(x, y_up)) * height_scale;

    // Screen y grows downward
    normalize_vec3(-dx, dy, 1.0)
}

fn normalize_vec3(x: f32, y: f32, z: f32) -> [f32; 3] {
    let len = (x * x + y * y + z * z).sqrt();
    [x / len, y / len, z / len]
}

/// Lay equally sized tiles out left to right in rows of `cols`, separated by a
/// dark gutter.
pub fn compose_grid(tiles: &[RgbImage], cols: u32) -> RgbImage {
    let gutter = 4u32;
    let cols = cols.max(1);
    let tile_w = tiles.iter().map(|t| t.width()).max().unwrap_or(0);
    let tile_h = tiles.iter().map(|t| t.height()).max().unwrap_or(0);
    let rows = (tiles.len() as u32).div_ceil(cols);

    let grid_w = cols * (tile_w + gutter) + gutter;
    let grid_h = rows * (tile_h + gutter) + gutter;
    let mut grid: RgbImage = ImageBuffer::from_pixel(grid_w, grid_h, Rgb([30, 30, 30]));

    for (idx, tile) in tiles.iter().enumerate() {
        let col = idx as u32 % cols;
        let row = idx as u32 / cols;
        let ox = gutter + col * (tile_w + gutter);
        let oy = gutter + row * (tile_h + gutter);
        image::imageops::replace(&mut grid, tile, ox as i64, oy as i64);
    }
    grid
}
