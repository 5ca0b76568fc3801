use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::EmbeddingError;
use crate::models::Sector;

#[derive(Debug, Clone)]
pub struct EmbeddedVector {
    pub sector: Sector,
    pub vec: Vec<f32>,
    pub dim: usize,
}

/// Adapter that produces one vector per sector for a text fragment
/// (`spec.md` §6.1). Implementations are consumed, never hosted, by this
/// core.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_multi_sector(
        &self,
        text: &str,
        sectors: &[Sector],
    ) -> Result<Vec<EmbeddedVector>, EmbeddingError>;

    async fn embed_query_for_all_sectors(
        &self,
        text: &str,
    ) -> Result<HashMap<Sector, Vec<f32>>, EmbeddingError>;
}

/// Streaming text generator (`spec.md` §6.2).
#[async_trait]
pub trait LlmGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, crate::errors::ProviderError>;
}
