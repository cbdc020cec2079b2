use crate::config::ModelConfig;
use crate::models::Chunk;
use crate::QaError;
use async_trait::async_trait;

/// Nearest-neighbour search over an immutable set of chunks.
#[async_trait]
pub trait VectorIndex {
    /// Number of chunks held by the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` chunks ordered by decreasing similarity to `query`.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Chunk>, QaError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub context_window: usize,
    pub thread_hint: usize,
}

/// A text-generation model. The pipeline holds two values of one implementing
/// type, a fast one and a primary one, configured differently.
#[async_trait]
pub trait GenerationBackend {
    fn config(&self) -> &ModelConfig;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, QaError>;
}
