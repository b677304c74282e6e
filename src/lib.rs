pub mod chunked;
pub mod embedding;
pub mod error;

pub use anyhow;
pub use async_trait::async_trait;
