//! Error types for the sculpting pipeline

use thiserror::Error;

use crate::region::Region;

/// Errors raised by an inference backend.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model load error: {0}")]
    Load(String),
    #[error("Tensor shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: [usize; 4], actual: Vec<usize> },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors raised by the sculpting pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum SculptError {
    #[error("Region {region:?} does not fit a {resolution}x{resolution} heightmap")]
    RegionOutOfBounds { region: Region, resolution: usize },
    #[error("Rectangle at ({x}, {y}) of size {width}x{height} does not fit a {resolution}x{resolution} heightmap")]
    RectOutOfBounds { x: usize, y: usize, width: usize, height: usize, resolution: usize },
    #[error("Grid size mismatch: expected {expected}x{expected}, got {width}x{height}")]
    GridMismatch { expected: usize, width: usize, height: usize },
    #[error("No stroke in progress")]
    NoActiveStroke,
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
