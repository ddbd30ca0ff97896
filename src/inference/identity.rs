//! Offline backend that echoes its input

use super::{Inferencer, ModelLoader, Tensor};
use crate::error::InferenceError;
use crate::params::TerrainKind;

/// Returns the input tensor unchanged.
pub struct IdentityModel {
    name: String,
}

impl Inferencer for IdentityModel {
    fn infer(&mut self, input: &Tensor) -> Result<Tensor, InferenceError> {
        Ok(input.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Loads an `IdentityModel` for every terrain kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityLoader;

impl ModelLoader for IdentityLoader {
    fn load(&self, kind: TerrainKind) -> Result<Box<dyn Inferencer>, InferenceError> {
        Ok(Box::new(IdentityModel {
            name: format!("identity-{}", kind),
        }))
    }
}
