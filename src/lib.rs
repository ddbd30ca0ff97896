//! Terrain sculpting library
//!
//! Brush strokes are accumulated into a per-stroke proposal, passed through a
//! generative terrain model and composited back into the heightmap.
//! Re-exports modules for use by binaries and tools.

pub mod brush;
pub mod composite;
pub mod error;
pub mod export;
pub mod heightmap;
pub mod inference;
pub mod input;
pub mod params;
pub mod pipeline;
pub mod region;
pub mod stylize;
pub mod tilemap;

pub use error::{InferenceError, SculptError};
pub use heightmap::{HeightStore, TerrainData, WorldPos};
pub use input::{Sculptor, SculptEvent};
pub use params::{SculptConfig, TerrainKind};
pub use pipeline::{CommitParams, CommitReport, TerrainModifier};
