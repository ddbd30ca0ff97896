//! Commit pipeline
//!
//! One commit runs extract → stylize → infer → restore → composite and
//! writes the result back to the terrain with a single `set_heights` call.
//! Every step before the write is side-effect free, so a failure anywhere
//! (including inference) leaves the terrain exactly as it was.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::brush::StrokeSession;
use crate::composite::{self, HeightFrame};
use crate::error::SculptError;
use crate::export;
use crate::heightmap::HeightStore;
use crate::inference::{self, ModelLoader};
use crate::params::{ExtractionSource, SculptConfig, StyleConfig, TerrainKind};
use crate::region::{self, Region};
use crate::stylize::{StyleImage, Stylizer};
use crate::tilemap::Tilemap;

/// Per-commit inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommitParams {
    pub kind: TerrainKind,
    /// Baseline terrain height in world units
    pub terrain_offset: f32,
    /// 0-100
    pub erosion_strength: f32,
    pub blur_strength: u32,
}

impl CommitParams {
    pub fn from_config(config: &SculptConfig) -> Self {
        Self {
            kind: config.terrain_kind,
            terrain_offset: config.terrain_offset,
            erosion_strength: config.erosion_strength.clamp(0.0, 100.0),
            blur_strength: config.blur_strength,
        }
    }
}

/// What a commit did.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitReport {
    pub region: Region,
    pub kind: TerrainKind,
    pub min_height: f32,
    pub max_height: f32,
    pub max_color: f32,
    pub cells_changed: usize,
    /// The generated image was black and nothing was written
    pub skipped: bool,
}

/// Runs commits against a terrain using models from `L`.
pub struct TerrainModifier<L: ModelLoader> {
    loader: L,
    stylizer: Stylizer,
    debug_dir: Option<PathBuf>,
}

impl<L: ModelLoader> TerrainModifier<L> {
    pub fn new(loader: L, style: StyleConfig) -> Self {
        Self {
            loader,
            stylizer: Stylizer::new(style),
            debug_dir: None,
        }
    }

    pub fn from_config(loader: L, config: &SculptConfig) -> Self {
        Self::new(loader, config.style.clone()).with_debug_dir(config.debug_dir.clone())
    }

    /// Write `h.png` (model input), `h0.png` (restored output) and `a.png`
    /// (region alpha) into `dir` on every commit.
    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    /// Run the pipeline over `region`.
    ///
    /// `source` is the full-resolution grid the region image is extracted from
    /// and `alphas` the full-resolution blend mask; both are indexed with the
    /// same global offsets as the terrain.
    pub fn modify_region<S: HeightStore + ?Sized>(
        &self,
        terrain: &mut S,
        source: &Tilemap<f32>,
        alphas: &Tilemap<f32>,
        region: Region,
        params: &CommitParams,
    ) -> Result<CommitReport, SculptError> {
        let start = Instant::now();
        let resolution = terrain.resolution();
        for grid in [source, alphas] {
            if grid.width != resolution || grid.height != resolution {
                return Err(SculptError::GridMismatch {
                    expected: resolution,
                    width: grid.width,
                    height: grid.height,
                });
            }
        }
        region.validate(resolution)?;
        info!(
            "Commit {} at ({}, {}) range {}",
            params.kind, region.x_offset, region.y_offset, region.range
        );

        let extracted = region::extract_region(source, region)?;
        let (prepared, input) =
            self.stylizer
                .to_input(&extracted.image, params.blur_strength, params.erosion_strength);

        let output = inference::run_once(&self.loader, params.kind, &input)?;
        let restored = self.stylizer.restore(&output, region.range as u32)?;

        let original = terrain.get_heights(region.x_offset, region.y_offset, region.range, region.range)?;
        let alpha = region.crop(alphas)?;
        let frame = HeightFrame {
            min_height: extracted.min_height,
            max_height: extracted.max_height,
            baseline: terrain.baseline(params.terrain_offset),
        };
        let merged = composite::composite(&restored, &original, &alpha, frame, params.kind)?;

        if !merged.skipped {
            terrain.set_heights(region.x_offset, region.y_offset, &merged.heights)?;
        }

        if let Some(dir) = &self.debug_dir {
            if let Err(e) = write_snapshots(dir, &prepared, &restored, &alpha) {
                warn!("Failed to write debug snapshots to {}: {}", dir.display(), e);
            }
        }

        info!(
            "Commit done in {:.2?}: {} cells changed{}",
            start.elapsed(),
            merged.cells_changed,
            if merged.skipped { " (skipped)" } else { "" }
        );

        Ok(CommitReport {
            region,
            kind: params.kind,
            min_height: extracted.min_height,
            max_height: extracted.max_height,
            max_color: merged.max_color,
            cells_changed: merged.cells_changed,
            skipped: merged.skipped,
        })
    }

    /// Commit a finished stroke. The session is consumed, so its buffers never
    /// outlive the commit.
    ///
    /// Returns `Ok(None)` if the stroke never produced a non-empty region.
    pub fn commit_stroke<S: HeightStore + ?Sized>(
        &self,
        terrain: &mut S,
        stroke: StrokeSession,
        params: &CommitParams,
        source: ExtractionSource,
    ) -> Result<Option<CommitReport>, SculptError> {
        let Some(region) = stroke.region() else {
            debug!("Stroke ended without a region; nothing to commit");
            return Ok(None);
        };
        let params = CommitParams { kind: stroke.kind(), ..*params };
        let (virtual_heights, alpha_mask) = stroke.into_parts();

        let report = match source {
            ExtractionSource::Stroke => {
                self.modify_region(terrain, &virtual_heights, &alpha_mask, region, &params)?
            }
            ExtractionSource::Live => {
                let live = terrain.all_heights()?;
                self.modify_region(terrain, &live, &alpha_mask, region, &params)?
            }
        };
        Ok(Some(report))
    }

    /// Run the pipeline over the whole terrain with full confidence everywhere,
    /// using the live heights as the source.
    pub fn restyle_terrain<S: HeightStore + ?Sized>(
        &self,
        terrain: &mut S,
        params: &CommitParams,
    ) -> Result<CommitReport, SculptError> {
        let resolution = terrain.resolution();
        let live = terrain.all_heights()?;
        let alphas = Tilemap::new_with(resolution, resolution, 1.0f32);
        self.modify_region(terrain, &live, &alphas, Region::full(resolution), params)
    }
}

fn write_snapshots(dir: &Path, prepared: &StyleImage, restored: &StyleImage, alpha: &Tilemap<f32>) -> Result<(), SculptError> {
    std::fs::create_dir_all(dir)?;
    export::save_style_image(prepared, &dir.join("h.png"))?;
    export::save_style_image(restored, &dir.join("h0.png"))?;
    export::save_mask(alpha, &dir.join("a.png"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::GridPos;
    use crate::error::InferenceError;
    use crate::heightmap::{TerrainData, WorldPos};
    use crate::inference::{IdentityLoader, Inferencer, Tensor};

    const RES: usize = 65;

    fn params(kind: TerrainKind) -> CommitParams {
        CommitParams {
            kind,
            terrain_offset: 50.0,
            erosion_strength: 0.0,
            blur_strength: 1,
        }
    }

    fn terrain() -> TerrainData {
        let mut t = TerrainData::new(RES, WorldPos::new(100.0, 600.0, 100.0), WorldPos::default());
        t.clear_terrain(50.0).unwrap();
        t
    }

    fn modifier() -> TerrainModifier<IdentityLoader> {
        let style = StyleConfig { model_size: 32, ..Default::default() };
        TerrainModifier::new(IdentityLoader, style)
    }

    struct BlackModel;

    impl Inferencer for BlackModel {
        fn infer(&mut self, input: &Tensor) -> Result<Tensor, InferenceError> {
            Tensor::new(input.shape(), vec![-1.0; input.data().len()])
        }

        fn name(&self) -> &str {
            "black"
        }
    }

    struct BlackLoader;

    impl ModelLoader for BlackLoader {
        fn load(&self, _kind: TerrainKind) -> Result<Box<dyn Inferencer>, InferenceError> {
            Ok(Box::new(BlackModel))
        }
    }

    #[test]
    fn test_stroke_commit_raises_inside_region_only() {
        let mut t = terrain();
        let before = t.heights().clone();
        let mut stroke = StrokeSession::new(TerrainKind::Mountain, RES, 600.0, 50.0);
        let center = GridPos::new(32.0, 32.0);
        stroke.raise(center, 120.0, 16, 16);
        stroke.track(center, 10.0);
        let region = stroke.region().unwrap();

        let report = modifier()
            .commit_stroke(&mut t, stroke, &params(TerrainKind::Mountain), ExtractionSource::Stroke)
            .unwrap()
            .unwrap();
        assert_eq!(report.region, region);
        assert!(!report.skipped);
        assert!(report.cells_changed > 0);

        let inside = |x: usize, y: usize| {
            x >= region.x_offset && x < region.x_offset + region.range
                && y >= region.y_offset && y < region.y_offset + region.range
        };
        for (x, y, &h) in t.heights().iter() {
            let b = *before.get(x, y);
            if inside(x, y) {
                assert!(h >= b);
            } else {
                assert_eq!(h, b);
            }
        }
    }

    #[test]
    fn test_empty_stroke_commits_nothing() {
        let mut t = terrain();
        let stroke = StrokeSession::new(TerrainKind::Glacier, RES, 600.0, 50.0);
        let report = modifier()
            .commit_stroke(&mut t, stroke, &params(TerrainKind::Glacier), ExtractionSource::Live)
            .unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn test_black_output_is_skipped() {
        let mut t = terrain();
        let before = t.heights().clone();
        let modifier = TerrainModifier::new(BlackLoader, StyleConfig { model_size: 16, ..Default::default() });
        let report = modifier.restyle_terrain(&mut t, &params(TerrainKind::Mountain)).unwrap();
        assert!(report.skipped);
        assert_eq!(report.max_color, 0.0);
        assert_eq!(t.heights(), &before);
    }

    #[test]
    fn test_restyle_covers_whole_terrain() {
        let mut t = terrain();
        let report = modifier().restyle_terrain(&mut t, &params(TerrainKind::Glacier)).unwrap();
        assert_eq!(report.region, Region::full(RES));
        // Flat source: neutral gray lifts everything above the baseline
        let baseline = 50.0 / 600.0;
        for (_, _, &h) in t.heights().iter() {
            assert!(h >= baseline);
        }
    }

    #[test]
    fn test_debug_snapshots_written_per_commit() {
        let dir = std::env::temp_dir().join(format!("terrain_sculpt_snapshots_{}", std::process::id()));
        let modifier = modifier().with_debug_dir(Some(dir.clone()));
        let mut t = terrain();
        let source = t.all_heights().unwrap();
        let alphas = Tilemap::new_with(RES, RES, 1.0f32);
        modifier
            .modify_region(&mut t, &source, &alphas, Region::new(4, 4, 40), &params(TerrainKind::Mountain))
            .unwrap();

        let dims = |name: &str| image::image_dimensions(dir.join(name)).unwrap();
        assert_eq!(dims("h.png"), (32, 32));
        assert_eq!(dims("h0.png"), (40, 40));
        assert_eq!(dims("a.png"), (40, 40));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_mismatched_source_rejected() {
        let mut t = terrain();
        let small = Tilemap::new_with(RES - 1, RES - 1, 0.0f32);
        let alphas = Tilemap::new_with(RES, RES, 1.0f32);
        let err = modifier()
            .modify_region(&mut t, &small, &alphas, Region::new(0, 0, 8), &params(TerrainKind::Mountain))
            .unwrap_err();
        assert!(matches!(err, SculptError::GridMismatch { .. }));
    }
}
