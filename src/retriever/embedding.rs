//! Query embedding.
//!
//! The index stores passage vectors produced by the ingestion tooling; at
//! query time the question is embedded with the same model and compared
//! against them.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequest, EmbeddingInput};
use async_trait::async_trait;

use crate::config::Settings;
use crate::error::IndexError;

/// Text embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier.
    fn model(&self) -> &str;

    /// Embeds one piece of text.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] when the service fails or returns
    /// no vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;
}

/// `OpenAI`-compatible embedding client.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedder {
    /// Creates an embedder for the configured embedding model.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut openai_config =
            OpenAIConfig::new().with_api_key(settings.api_key.as_deref().unwrap_or_default());
        if let Some(ref base_url) = settings.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }
        Self {
            client: Client::with_config(openai_config),
            model: settings.embedding_model.clone(),
        }
    }
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            encoding_format: None,
            user: None,
            dimensions: None,
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| IndexError::Embedding("service returned no embedding".to_string()))
    }
}
