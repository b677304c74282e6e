use std::sync::Arc;

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use tracing::debug;
use vettore::{
    anyhow::{anyhow, Result},
    chunked::ChunkedEmbedder,
    embedding::{Embedding, EmbeddingClient},
};

pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// `EmbeddingClient` backed by the OpenAI embeddings API, or any
/// OpenAI-compatible endpoint via `with_base_url`.
pub struct OpenAiEmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: Option<u32>,
}

pub struct OpenAiEmbeddingClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    dimensions: Option<u32>,
}

impl OpenAiEmbeddingClient {
    pub fn builder() -> OpenAiEmbeddingClientBuilder {
        OpenAiEmbeddingClientBuilder {
            api_key: None,
            base_url: None,
            model: None,
            dimensions: None,
        }
    }

    /// A [`ChunkedEmbedder`] over this client with the default configuration.
    pub fn into_embedder(self) -> ChunkedEmbedder {
        ChunkedEmbedder::new(Arc::new(self))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl OpenAiEmbeddingClientBuilder {
    pub fn with_api_key<S>(mut self, api_key: S) -> Self
    where
        S: AsRef<str>,
    {
        self.api_key = Some(api_key.as_ref().to_string());
        self
    }

    pub fn with_base_url<S>(mut self, base_url: S) -> Self
    where
        S: AsRef<str>,
    {
        self.base_url = Some(base_url.as_ref().to_string());
        self
    }

    pub fn with_model<S>(mut self, model: S) -> Self
    where
        S: AsRef<str>,
    {
        self.model = Some(model.as_ref().to_string());
        self
    }

    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn build(self) -> Result<OpenAiEmbeddingClient> {
        let api_key = match self.api_key {
            Some(api_key) => api_key,
            None => std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("OPENAI_API_KEY is not set"))?,
        };

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = self.base_url {
            config = config.with_api_base(base_url);
        }

        Ok(OpenAiEmbeddingClient {
            client: Client::with_config(config),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dimensions: self.dimensions,
        })
    }
}

#[vettore::async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn create_embeddings(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        // The remote API rejects an empty input array.
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        debug!(model = %self.model, batch_size = expected, "creating embeddings");

        let mut request = CreateEmbeddingRequestArgs::default();
        request.model(self.model.as_str()).input(texts);
        if let Some(dimensions) = self.dimensions {
            request.dimensions(dimensions);
        }

        let response = self.client.embeddings().create(request.build()?).await?;

        if response.data.len() != expected {
            return Err(anyhow!(
                "expected {} embeddings, got {}",
                expected,
                response.data.len()
            ));
        }

        Ok(response
            .data
            .into_iter()
            .map(|data| data.embedding.into())
            .collect())
    }
}
