//! Sculpting parameters and configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SculptError;

/// Kind of terrain the generative pass produces.
///
/// Selects both the model and the compositing sign: Mountain and Glacier can
/// only raise the surface, Canyon can only lower it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainKind {
    #[default]
    Mountain,
    Canyon,
    Glacier,
}

impl TerrainKind {
    pub fn all() -> &'static [Self] {
        &[Self::Mountain, Self::Canyon, Self::Glacier]
    }

    /// Next kind in the controller cycle (Mountain, Canyon, Glacier, Mountain...).
    pub fn next(&self) -> Self {
        match self {
            Self::Mountain => Self::Canyon,
            Self::Canyon => Self::Glacier,
            Self::Glacier => Self::Mountain,
        }
    }

    /// Whether generated terrain is carved into the surface instead of added on top.
    pub fn is_subtractive(&self) -> bool {
        matches!(self, Self::Canyon)
    }
}

impl std::fmt::Display for TerrainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mountain => write!(f, "mountain"),
            Self::Canyon => write!(f, "canyon"),
            Self::Glacier => write!(f, "glacier"),
        }
    }
}

impl std::str::FromStr for TerrainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mountain" => Ok(Self::Mountain),
            "canyon" => Ok(Self::Canyon),
            "glacier" => Ok(Self::Glacier),
            other => Err(format!("unknown terrain kind '{}'", other)),
        }
    }
}

/// Which grid feeds the region extractor on a stroke commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    /// The stroke's accumulated virtual heights (the rough sketched shape).
    #[default]
    Stroke,
    /// The live terrain heights.
    Live,
}

/// Brush constants. These were tuned by eye and are kept configurable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Brush width in cells per world unit of stroke offset
    pub size_factor: f32,
    /// Region margin in cells per world unit of stroke offset
    pub radius_factor: f32,
    /// Strength divisor for the outline stamp of a filled stroke
    pub filled_strength_divisor: f32,
    /// Side length of the footprint stamped by `fill_between`
    pub fill_stamp_size: usize,
    /// Brush width for a size slider value of 1.0
    pub size_slider_scale: f32,
    /// Editor brush width (cells)
    pub width: usize,
    /// Editor brush height (cells)
    pub height: usize,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            size_factor: 3.0,
            radius_factor: 2.0,
            filled_strength_divisor: 4.0,
            fill_stamp_size: 20,
            size_slider_scale: 500.0,
            width: 200,
            height: 200,
        }
    }
}

/// Stylization pass parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Square side of the model input/output raster
    pub model_size: u32,
    /// Pixel period divisor for the erosion noise
    pub noise_period: f64,
    /// Peak relative brightness change at erosion strength 100
    pub noise_amplitude: f32,
    /// Number of discrete levels per channel after quantization
    pub quantize_levels: u32,
    pub noise_seed: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            model_size: 256,
            noise_period: 25.0,
            noise_amplitude: 0.4,
            quantize_levels: 5,
            noise_seed: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    /// Returns its input unchanged. Useful offline and in tests.
    #[default]
    Identity,
    /// Remote model server over HTTP.
    Http,
}

/// Model selection and backend settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub backend: InferenceBackend,
    /// Base URL of the model server (e.g., "http://127.0.0.1:8500")
    pub base_url: String,
    pub mountain_model: String,
    pub canyon_model: String,
    pub glacier_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: InferenceBackend::Identity,
            base_url: "http://127.0.0.1:8500".to_string(),
            mountain_model: "mountain".to_string(),
            canyon_model: "canyon".to_string(),
            glacier_model: "glacier".to_string(),
            timeout_secs: 120,
        }
    }
}

impl InferenceConfig {
    pub fn model_name(&self, kind: TerrainKind) -> &str {
        match kind {
            TerrainKind::Mountain => &self.mountain_model,
            TerrainKind::Canyon => &self.canyon_model,
            TerrainKind::Glacier => &self.glacier_model,
        }
    }
}

/// Top-level sculpting configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SculptConfig {
    /// Baseline terrain height in world units
    pub terrain_offset: f32,
    /// Pseudo-erosion strength (0-100)
    pub erosion_strength: f32,
    /// Blur radius in pixels applied before inference
    pub blur_strength: u32,
    /// Whether strokes fill their interior
    pub filled: bool,
    pub terrain_kind: TerrainKind,
    pub extraction_source: ExtractionSource,
    pub brush: BrushConfig,
    pub style: StyleConfig,
    pub inference: InferenceConfig,
    /// Directory for per-commit PNG snapshots (disabled when unset)
    pub debug_dir: Option<PathBuf>,
}

impl Default for SculptConfig {
    fn default() -> Self {
        Self {
            terrain_offset: 50.0,
            erosion_strength: 100.0,
            blur_strength: 15,
            filled: false,
            terrain_kind: TerrainKind::Mountain,
            extraction_source: ExtractionSource::Stroke,
            brush: BrushConfig::default(),
            style: StyleConfig::default(),
            inference: InferenceConfig::default(),
            debug_dir: None,
        }
    }
}

impl SculptConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, SculptError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SculptError> {
        let mut config: SculptConfig = serde_json::from_str(text)?;
        config.erosion_strength = config.erosion_strength.clamp(0.0, 100.0);
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, SculptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
