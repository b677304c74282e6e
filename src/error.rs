use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
