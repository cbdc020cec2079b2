use crate::chunking::build_chunks;
use crate::embeddings::Embedder;
use crate::models::{Chunk, DocumentRecord, IngestionOptions};
use crate::traits::VectorIndex;
use crate::QaError;
use async_trait::async_trait;
use tracing::info;

struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Brute-force cosine index kept in memory for one session.
pub struct InMemoryVectorIndex<E> {
    entries: Vec<IndexedChunk>,
    embedder: E,
}

#[async_trait]
impl<E: Embedder> VectorIndex for InMemoryVectorIndex<E> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Chunk>, QaError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&query_vector, &entry.embedding), entry))
            .collect();

        // sort_by is stable, so equal scores keep insertion order.
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, entry)| entry.chunk.clone())
            .collect())
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|a| a * a).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|b| b * b).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

pub struct IndexBuilder<E> {
    embedder: E,
}

impl<E: Embedder> IndexBuilder<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    /// Chunks and embeds `records`, returning the finished index and its chunk count.
    pub async fn build(
        self,
        records: &[DocumentRecord],
    ) -> Result<(InMemoryVectorIndex<E>, usize), QaError> {
        let options = IngestionOptions::default();
        let mut chunks = Vec::new();
        let mut cursor = 0u64;
        for record in records {
            let (record_chunks, next_cursor) = build_chunks(record, &options, cursor)?;
            cursor = next_cursor;
            chunks.extend(record_chunks);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(QaError::BackendResponse {
                backend: "embedder".to_string(),
                details: format!(
                    "embedding count {} doesn't match chunk count {}",
                    embeddings.len(),
                    chunks.len()
                ),
            });
        }

        let entries: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();
        let chunk_count = entries.len();

        info!(records = records.len(), chunk_count, "vector index built");

        Ok((
            InMemoryVectorIndex {
                entries,
                embedder: self.embedder,
            },
            chunk_count,
        ))
    }
}
