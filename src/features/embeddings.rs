//! Embeddings.

use std::sync::Arc;

use async_trait::async_trait;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::client::ClientError;
use crate::endpoint::Endpoint;
use crate::executor::RequestExecutor;
use crate::model::{Model, ModelPurpose};

/// Request body for `POST embeddings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: Model,
    /// Texts to embed, one vector each.
    pub input: NonEmpty<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl EmbeddingRequest {
    pub fn new(model: Model, input: NonEmpty<String>) -> Self {
        Self {
            model,
            input,
            user: None,
        }
    }

    /// A request for a single text.
    pub fn single(model: Model, text: impl Into<String>) -> Self {
        Self::new(model, NonEmpty::new(text.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub model: String,
    pub data: Vec<Embedding>,
    #[serde(default)]
    pub usage: EmbeddingUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    #[serde(default)]
    pub object: String,
    pub embedding: Vec<f64>,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait EmbeddingsApi: Send + Sync {
    async fn create_embeddings(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, ClientError>;

    /// Embed one text and return its vector.
    async fn embed(&self, text: &str, model: Model) -> Result<Vec<f64>, ClientError>;
}

/// [`EmbeddingsApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct EmbeddingsEndpoint {
    executor: Arc<RequestExecutor>,
}

impl EmbeddingsEndpoint {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub fn default_model() -> Model {
        Model::default_for(ModelPurpose::Embedding)
    }
}

#[async_trait]
impl EmbeddingsApi for EmbeddingsEndpoint {
    async fn create_embeddings(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, ClientError> {
        self.executor.request(&Endpoint::Embeddings, Some(request)).await
    }

    async fn embed(&self, text: &str, model: Model) -> Result<Vec<f64>, ClientError> {
        let response = self
            .create_embeddings(&EmbeddingRequest::single(model, text))
            .await?;
        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or(ClientError::InvalidResponse)
    }
}
