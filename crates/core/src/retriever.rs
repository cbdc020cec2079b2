use crate::models::{renumber, CandidateSet, Query};
use crate::traits::VectorIndex;
use crate::QaError;
use tracing::debug;

/// Top-`k` chunks for `question`, numbered `[Source 1]..[Source n]` for this run only.
pub async fn retrieve<I>(index: &I, question: &str, k: usize) -> Result<CandidateSet, QaError>
where
    I: VectorIndex + Sync,
{
    if index.is_empty() {
        return Err(QaError::IndexEmpty);
    }
    if k == 0 {
        return Err(QaError::InvalidQuery("k must be at least 1".to_string()));
    }

    let hits = index.similarity_search(question, k).await?;
    debug!(requested = k, returned = hits.len(), "retrieved candidates");

    Ok(renumber(hits.into_iter().take(k).collect()))
}

pub async fn retrieve_query<I>(index: &I, query: &Query) -> Result<CandidateSet, QaError>
where
    I: VectorIndex + Sync,
{
    retrieve(index, &query.question, query.k).await
}
