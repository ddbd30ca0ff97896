//! Inference adapter for the generative terrain models
//!
//! The models are opaque: a `ModelLoader` hands out an `Inferencer` for a
//! `TerrainKind`, and an `Inferencer` maps one `[1, H, W, 3]` tensor to another
//! of the same shape. Nothing here depends on a particular runtime.
//!
//! Every commit opens a fresh `InferenceSession`, runs exactly one forward
//! pass and drops it. Dropping the session releases the backend, including
//! on the error path.

pub mod http;
pub mod identity;

use log::debug;

use crate::error::InferenceError;
use crate::params::{InferenceBackend, InferenceConfig, TerrainKind};

pub use http::{HttpLoader, HttpModel};
pub use identity::{IdentityLoader, IdentityModel};

/// A dense NHWC float tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, InferenceError> {
        if shape.iter().product::<usize>() != data.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: shape,
                actual: vec![data.len()],
            });
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: [usize; 4]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    /// Single-batch three-channel image tensor. `data` must be `width * height * 3` long.
    pub(crate) fn image_batch(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self { shape: [1, height, width, 3], data }
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// One loaded model.
pub trait Inferencer {
    /// Run a single forward pass.
    fn infer(&mut self, input: &Tensor) -> Result<Tensor, InferenceError>;

    /// Free backend resources. Called exactly once, when the owning session drops.
    fn release(&mut self) {}

    fn name(&self) -> &str;
}

/// Loads the model that generates a given terrain kind.
pub trait ModelLoader {
    fn load(&self, kind: TerrainKind) -> Result<Box<dyn Inferencer>, InferenceError>;
}

impl<L: ModelLoader + ?Sized> ModelLoader for Box<L> {
    fn load(&self, kind: TerrainKind) -> Result<Box<dyn Inferencer>, InferenceError> {
        (**self).load(kind)
    }
}

/// Scoped ownership of a loaded model. Release happens in `Drop`.
pub struct InferenceSession {
    kind: TerrainKind,
    model: Box<dyn Inferencer>,
}

impl InferenceSession {
    pub fn open(loader: &dyn ModelLoader, kind: TerrainKind) -> Result<Self, InferenceError> {
        let model = loader.load(kind)?;
        debug!("Inference session opened: {} ({})", model.name(), kind);
        Ok(Self { kind, model })
    }

    /// Run the model and check that the output has the input's shape.
    pub fn run(&mut self, input: &Tensor) -> Result<Tensor, InferenceError> {
        let output = self.model.infer(input)?;
        if output.shape() != input.shape() {
            return Err(InferenceError::ShapeMismatch {
                expected: input.shape(),
                actual: output.shape().to_vec(),
            });
        }
        Ok(output)
    }
}

impl Drop for InferenceSession {
    fn drop(&mut self) {
        self.model.release();
        debug!("Inference session released: {} ({})", self.model.name(), self.kind);
    }
}

/// Load the model for `kind`, run one forward pass, release the model.
pub fn run_once(loader: &dyn ModelLoader, kind: TerrainKind, input: &Tensor) -> Result<Tensor, InferenceError> {
    let mut session = InferenceSession::open(loader, kind)?;
    session.run(input)
}

/// Build the loader selected by the configuration.
pub fn loader_from_config(config: &InferenceConfig) -> Result<Box<dyn ModelLoader>, InferenceError> {
    match config.backend {
        InferenceBackend::Identity => Ok(Box::new(IdentityLoader)),
        InferenceBackend::Http => Ok(Box::new(HttpLoader::new(config.clone())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingModel {
        released: Rc<Cell<usize>>,
        fail: bool,
    }

    impl Inferencer for CountingModel {
        fn infer(&mut self, input: &Tensor) -> Result<Tensor, InferenceError> {
            if self.fail {
                Err(InferenceError::Backend("boom".to_string()))
            } else {
                Ok(input.clone())
            }
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct CountingLoader {
        released: Rc<Cell<usize>>,
        fail: bool,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, _kind: TerrainKind) -> Result<Box<dyn Inferencer>, InferenceError> {
            Ok(Box::new(CountingModel {
                released: self.released.clone(),
                fail: self.fail,
            }))
        }
    }

    #[test]
    fn test_session_released_after_success() {
        let released = Rc::new(Cell::new(0));
        let loader = CountingLoader { released: released.clone(), fail: false };
        let input = Tensor::zeros([1, 8, 8, 3]);
        let out = run_once(&loader, TerrainKind::Mountain, &input).unwrap();
        assert_eq!(out, input);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_session_released_after_failure() {
        let released = Rc::new(Cell::new(0));
        let loader = CountingLoader { released: released.clone(), fail: true };
        let input = Tensor::zeros([1, 8, 8, 3]);
        assert!(run_once(&loader, TerrainKind::Canyon, &input).is_err());
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_tensor_shape_checked() {
        assert!(Tensor::new([1, 2, 2, 3], vec![0.0; 12]).is_ok());
        assert!(matches!(
            Tensor::new([1, 2, 2, 3], vec![0.0; 11]),
            Err(InferenceError::ShapeMismatch { .. })
        ));
    }
}
