use anyhow::Result;

use crate::async_trait;

/// A dense vector produced by an embedding model. Dimensionality is decided
/// by the provider and is uniform within one response.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.clone()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Vec<f32> {
        embedding.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self(vector)
    }
}

/// Contract of a remote embedding API: one vector per input text, in input
/// order. Credentials, transport, and retry policy belong to the implementor.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn create_embeddings(&self, texts: Vec<String>) -> Result<Vec<Embedding>>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of documents, one vector per document, in input order.
    async fn embed_documents(&self, documents: Vec<String>) -> Result<Vec<Embedding>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Embedding>;
}
