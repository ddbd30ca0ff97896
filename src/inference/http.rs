//! Remote model server backend
//!
//! Talks to a model server over HTTP. Tensors travel as JSON with the shape
//! spelled out and the data as base64-encoded native-endian `f32`s.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{Inferencer, ModelLoader, Tensor};
use crate::error::InferenceError;
use crate::params::{InferenceConfig, TerrainKind};

/// Wire form of a tensor.
#[derive(Serialize, Deserialize, Debug)]
pub struct TensorPayload {
    pub shape: Vec<usize>,
    /// Base64 of the raw `f32` buffer
    pub data: String,
}

impl TensorPayload {
    pub fn encode(tensor: &Tensor) -> Self {
        let bytes: &[u8] = bytemuck::cast_slice(tensor.data());
        Self {
            shape: tensor.shape().to_vec(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Tensor, InferenceError> {
        let shape: [usize; 4] = self.shape.as_slice().try_into().map_err(|_| {
            InferenceError::Decode(format!("expected a rank-4 shape, got {:?}", self.shape))
        })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| InferenceError::Decode(format!("Base64 decode error: {}", e)))?;
        if bytes.len() % 4 != 0 {
            return Err(InferenceError::Decode(format!(
                "payload of {} bytes is not a whole number of f32s",
                bytes.len()
            )));
        }
        let data: Vec<f32> = bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        Tensor::new(shape, data)
    }
}

#[derive(Serialize, Debug)]
struct InferRequest<'a> {
    model: &'a str,
    input: TensorPayload,
}

#[derive(Deserialize, Debug)]
struct InferResponse {
    output: TensorPayload,
}

/// A model hosted on the server.
pub struct HttpModel {
    base_url: String,
    model: String,
    client: Option<reqwest::blocking::Client>,
}

impl HttpModel {
    fn client(&self) -> Result<&reqwest::blocking::Client, InferenceError> {
        self.client
            .as_ref()
            .ok_or_else(|| InferenceError::Backend(format!("model '{}' already released", self.model)))
    }
}

impl Inferencer for HttpModel {
    fn infer(&mut self, input: &Tensor) -> Result<Tensor, InferenceError> {
        let url = format!("{}/v1/models/{}/infer", self.base_url, self.model);
        let request = InferRequest {
            model: &self.model,
            input: TensorPayload::encode(input),
        };

        let response = self
            .client()?
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Backend(format!("Status {}: {}", status, body)));
        }

        let parsed: InferResponse = response
            .json()
            .map_err(|e| InferenceError::Decode(e.to_string()))?;
        parsed.output.decode()
    }

    fn release(&mut self) {
        self.client = None;
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Loads models from a model server, checking that the requested model exists.
pub struct HttpLoader {
    config: InferenceConfig,
    client: reqwest::blocking::Client,
}

impl HttpLoader {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Load(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl ModelLoader for HttpLoader {
    fn load(&self, kind: TerrainKind) -> Result<Box<dyn Inferencer>, InferenceError> {
        let model = self.config.model_name(kind).to_string();
        let url = format!("{}/v1/models/{}", self.config.base_url, model);
        let available = self
            .client
            .get(&url)
            .send()
            .map(|r| r.status().is_success())
            .map_err(|e| InferenceError::Network(e.to_string()))?;
        if !available {
            return Err(InferenceError::Load(format!(
                "model '{}' is not available at {}",
                model, self.config.base_url
            )));
        }

        Ok(Box::new(HttpModel {
            base_url: self.config.base_url.clone(),
            model,
            client: Some(self.client.clone()),
        }))
    }
}
