//! Brush geometry and per-stroke accumulation
//!
//! - **geometry**: footprint placement, edge clamping, falloff curves
//! - **stroke**: `StrokeSession` buffers (virtual heights + alpha mask)

pub mod geometry;
pub mod stroke;

pub use geometry::{place_brush, BrushRect, GridPos};
pub use stroke::{flatten_rect, StrokeBounds, StrokeSession};

/// Editor brush action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushAction {
    #[default]
    Raise,
    Lower,
    Flatten,
    Sample,
    SampleAverage,
}

impl BrushAction {
    pub fn all() -> &'static [Self] {
        &[Self::Raise, Self::Lower, Self::Flatten, Self::Sample, Self::SampleAverage]
    }

    /// Action for a dropdown index (0-4).
    pub fn from_index(i: usize) -> Option<Self> {
        Self::all().get(i).copied()
    }
}

/// Brush width and height for a size slider value.
pub fn brush_size_from_slider(size: f32, slider_scale: f32) -> (usize, usize) {
    let side = (slider_scale * size).max(0.0) as usize;
    (side, side)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_index() {
        assert_eq!(BrushAction::from_index(2), Some(BrushAction::Flatten));
        assert_eq!(BrushAction::from_index(4), Some(BrushAction::SampleAverage));
        assert_eq!(BrushAction::from_index(5), None);
    }

    #[test]
    fn test_slider_size() {
        assert_eq!(brush_size_from_slider(0.4, 500.0), (200, 200));
        assert_eq!(brush_size_from_slider(-1.0, 500.0), (0, 0));
    }
}
