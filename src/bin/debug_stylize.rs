//! Debug tool for comparing stylization parameters visually
//! Generates a grid of pre-inference images for a sketched ridge under
//! different blur and erosion settings, plus the composited result of each.

use image::RgbImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use terrain_sculpt::brush::{GridPos, StrokeSession};
use terrain_sculpt::export;
use terrain_sculpt::heightmap::{HeightStore, TerrainData, WorldPos};
use terrain_sculpt::inference::IdentityLoader;
use terrain_sculpt::params::{ExtractionSource, StyleConfig, TerrainKind};
use terrain_sculpt::pipeline::{CommitParams, TerrainModifier};
use terrain_sculpt::region::extract_region;
use terrain_sculpt::stylize::Stylizer;

const RESOLUTION: usize = 257;
const SIZE_Y: f32 = 600.0;
const OFFSET: f32 = 50.0;
const SEED: u64 = 42;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    println!("Generating stylization comparison grid...");

    // One wandering ridge, reused for every variant
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut stroke = StrokeSession::new(TerrainKind::Mountain, RESOLUTION, SIZE_Y, OFFSET);
    let mut p = GridPos::new(60.0, 60.0);
    for _ in 0..40 {
        p.x = (p.x + rng.gen_range(1.0..5.0)).min(200.0);
        p.y = (p.y + rng.gen_range(-2.0..5.0)).clamp(20.0, 200.0);
        let lift: f32 = rng.gen_range(20.0..50.0);
        let size = (lift * 3.0) as usize;
        stroke.raise(p, lift, size, size);
        stroke.track(p, lift * 2.0);
    }
    let Some(region) = stroke.region() else {
        println!("Stroke produced no region");
        return;
    };
    println!("Region: ({}, {}) range {}", region.x_offset, region.y_offset, region.range);

    let extracted = match extract_region(stroke.virtual_heights(), region) {
        Ok(e) => e,
        Err(e) => {
            println!("Extraction failed: {}", e);
            return;
        }
    };

    let variants: [(u32, f32); 6] = [(0, 0.0), (8, 0.0), (15, 0.0), (8, 50.0), (15, 100.0), (25, 100.0)];
    let stylizer = Stylizer::new(StyleConfig::default());

    let mut inputs: Vec<RgbImage> = Vec::new();
    let mut results: Vec<RgbImage> = Vec::new();
    for (blur, erosion) in variants {
        println!("  blur {:>2}, erosion {:>5.1}", blur, erosion);
        inputs.push(export::render_style_image(&stylizer.prepare(&extracted.image, blur, erosion)));

        let mut terrain = TerrainData::new(RESOLUTION, WorldPos::new(1000.0, SIZE_Y, 1000.0), WorldPos::default());
        if let Err(e) = terrain.clear_terrain(OFFSET) {
            println!("    clear failed: {}", e);
            continue;
        }
        let modifier = TerrainModifier::new(IdentityLoader, StyleConfig::default());
        let params = CommitParams {
            kind: TerrainKind::Mountain,
            terrain_offset: OFFSET,
            erosion_strength: erosion,
            blur_strength: blur,
        };
        match modifier.commit_stroke(&mut terrain, stroke.clone(), &params, ExtractionSource::Stroke) {
            Ok(Some(report)) => println!("    {} cells changed", report.cells_changed),
            Ok(None) => println!("    nothing committed"),
            Err(e) => println!("    commit failed: {}", e),
        }
        let patch = terrain
            .get_heights(region.x_offset, region.y_offset, region.range, region.range)
            .map(|h| export::render_hillshade(&h, 400.0));
        match patch {
            Ok(img) => results.push(image::imageops::resize(
                &img,
                256,
                256,
                image::imageops::FilterType::Triangle,
            )),
            Err(e) => println!("    readback failed: {}", e),
        }
    }

    // Row 1: model inputs, row 2: composited terrain
    let mut tiles = inputs;
    tiles.extend(results);
    let grid = export::compose_grid(&tiles, variants.len() as u32);
    let filename = "stylize_comparison.png";
    match grid.save(filename) {
        Ok(()) => println!("Saved {}", filename),
        Err(e) => println!("Failed to save {}: {}", filename, e),
    }
}
