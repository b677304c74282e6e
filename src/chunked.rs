use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::{
    async_trait,
    embedding::{Embedder, Embedding, EmbeddingClient},
    error::EmbeddingError,
};

/// Default number of characters per chunk submitted to the provider.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// An `Embedder` that splits documents longer than `chunk_size` characters
/// into chunks, embeds all chunks in one request, and folds each document's
/// chunk vectors back into a single unit-length vector.
pub struct ChunkedEmbedder {
    client: Arc<dyn EmbeddingClient>,
    strip_new_lines: bool,
    chunk_size: usize,
}

pub struct ChunkedEmbedderBuilder {
    client: Option<Arc<dyn EmbeddingClient>>,
    strip_new_lines: Option<bool>,
    chunk_size: Option<usize>,
}

impl ChunkedEmbedder {
    /// Wraps a client with the default configuration: newline stripping
    /// enabled, chunks of [`DEFAULT_CHUNK_SIZE`] characters.
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        ChunkedEmbedder {
            client,
            strip_new_lines: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn builder() -> ChunkedEmbedderBuilder {
        ChunkedEmbedderBuilder {
            client: None,
            strip_new_lines: None,
            chunk_size: None,
        }
    }

    fn prepare(&self, text: &str) -> String {
        if self.strip_new_lines {
            text.replace('\n', " ")
        } else {
            text.to_string()
        }
    }
}

impl ChunkedEmbedderBuilder {
    pub fn with_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_strip_new_lines(mut self, strip_new_lines: bool) -> Self {
        self.strip_new_lines = Some(strip_new_lines);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn build(self) -> Result<ChunkedEmbedder> {
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(anyhow!("chunk size must be greater than zero"));
        }

        Ok(ChunkedEmbedder {
            client: self.client.ok_or_else(|| anyhow!("client is required"))?,
            strip_new_lines: self.strip_new_lines.unwrap_or(true),
            chunk_size,
        })
    }
}

#[async_trait]
impl Embedder for ChunkedEmbedder {
    async fn embed_documents(&self, documents: Vec<String>) -> Result<Vec<Embedding>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let chunked: Vec<Vec<String>> = documents
            .iter()
            .map(|document| chunk_text(&self.prepare(document), self.chunk_size))
            .collect();

        let weights: Vec<Vec<usize>> = chunked
            .iter()
            .map(|chunks| chunks.iter().map(|chunk| chunk.chars().count()).collect())
            .collect();

        let submitted: usize = chunked.iter().map(Vec::len).sum();
        let vectors = self
            .client
            .create_embeddings(chunked.into_iter().flatten().collect())
            .await?;

        if vectors.len() != submitted {
            return Err(EmbeddingError::InvalidInput(format!(
                "submitted {} chunks but received {} embeddings",
                submitted,
                vectors.len()
            ))
            .into());
        }

        let mut vectors = vectors.into_iter();
        let mut embeddings = Vec::with_capacity(weights.len());
        for document_weights in &weights {
            let parts: Vec<Embedding> = vectors.by_ref().take(document_weights.len()).collect();
            embeddings.push(combine_embeddings(&parts, document_weights)?);
        }

        Ok(embeddings)
    }

    /// Returns the provider's vector unchanged; queries are submitted whole,
    /// without chunking or re-normalization.
    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        let vectors = self
            .client
            .create_embeddings(vec![self.prepare(text)])
            .await?;

        vectors.into_iter().next().ok_or_else(|| {
            EmbeddingError::InvalidResponse(
                "provider returned no embedding for a single-text request".into(),
            )
            .into()
        })
    }
}

/// Split on character boundaries into runs of at most `chunk_size`
/// characters; the last run may be shorter.
fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Average the vectors weighted by their chunk's character count, then scale
/// the result to unit length.
fn combine_embeddings(parts: &[Embedding], weights: &[usize]) -> Result<Embedding> {
    if parts.len() != weights.len() {
        return Err(EmbeddingError::InvalidInput(format!(
            "{} embeddings with {} weights",
            parts.len(),
            weights.len()
        ))
        .into());
    }

    let Some(first) = parts.first() else {
        return Err(EmbeddingError::InvalidInput("no embeddings to combine".into()).into());
    };

    let mut total: f32 = weights.iter().map(|weight| *weight as f32).sum();
    // An empty document carries a single zero-length chunk; average it evenly
    // rather than dividing by a zero total.
    let weights: Vec<f32> = if total == 0.0 {
        total = parts.len() as f32;
        vec![1.0; parts.len()]
    } else {
        weights.iter().map(|weight| *weight as f32).collect()
    };

    let mut combined = vec![0.0f32; first.len()];
    for (part, weight) in parts.iter().zip(&weights) {
        for (sum, value) in combined.iter_mut().zip(part.as_slice()) {
            *sum += value * weight;
        }
    }

    for value in combined.iter_mut() {
        *value /= total;
    }

    let norm = combined.iter().map(|value| value * value).sum::<f32>().sqrt();
    for value in combined.iter_mut() {
        *value /= norm;
    }

    Ok(Embedding::from(combined))
}
