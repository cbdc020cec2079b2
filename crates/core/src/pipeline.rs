use crate::cache::{AnswerCache, CacheKey};
use crate::config::PipelineConfig;
use crate::filter::RelevanceFilter;
use crate::models::{renumber, Answer, AnswerOutcome, Chunk, Query};
use crate::retriever::retrieve;
use crate::synthesizer::AnswerSynthesizer;
use crate::traits::{GenerationBackend, VectorIndex};
use crate::validator::GroundingValidator;
use crate::QaError;
use tracing::{info, warn};
use uuid::Uuid;

/// Retrieve, filter, synthesize and validate, with answers memoized per session.
///
/// The pipeline owns its index, so the index is complete before the first
/// question can be asked. `fast` runs the relevance filter and `primary` writes
/// the answer; both are the same backend type with different model settings.
pub struct QaPipeline<I, B> {
    index: I,
    fast: B,
    primary: B,
    cache: AnswerCache,
    filter: RelevanceFilter,
    synthesizer: AnswerSynthesizer,
    validator: GroundingValidator,
    default_k: usize,
    session_id: Uuid,
}

impl<I, B> QaPipeline<I, B>
where
    I: VectorIndex + Send + Sync,
    B: GenerationBackend + Send + Sync,
{
    pub fn new(index: I, fast: B, primary: B, config: &PipelineConfig) -> Result<Self, QaError> {
        Ok(Self {
            index,
            fast,
            primary,
            cache: AnswerCache::new(),
            filter: RelevanceFilter::from_config(config),
            synthesizer: AnswerSynthesizer::from_config(config),
            validator: GroundingValidator::new()?,
            default_k: config.default_k,
            session_id: Uuid::new_v4(),
        })
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub async fn answer_query(&self, query: &Query) -> Result<Answer, QaError> {
        self.answer_question(&query.question, query.k).await
    }

    pub async fn answer_question_default(&self, question: &str) -> Result<Answer, QaError> {
        self.answer_question(question, self.default_k).await
    }

    pub async fn answer_question(&self, question: &str, k: usize) -> Result<Answer, QaError> {
        let key = CacheKey::new(question, k);
        if let Some(cached) = self.cache.get(&key).await {
            info!(session = %self.session_id, k, "answer served from cache");
            return Ok(cached);
        }

        let candidates = retrieve(&self.index, question, k).await?;
        let selection = self.filter.select(&self.fast, question, &candidates).await?;
        let sources = self.choose_sources(&candidates, &selection, k);

        let raw = self
            .synthesizer
            .synthesize(&self.primary, question, &sources)
            .await?;
        let validated = self.validator.validate(&raw);

        match validated.outcome {
            AnswerOutcome::Blocked => {
                warn!(
                    session = %self.session_id,
                    "answer carried no citation markers and was blocked"
                );
            }
            AnswerOutcome::Grounded => {
                let stray = self.validator.out_of_range_citations(&validated.text, sources.len());
                if !stray.is_empty() {
                    warn!(
                        session = %self.session_id,
                        ?stray,
                        sources = sources.len(),
                        "answer cites sources that were not supplied"
                    );
                }
            }
        }

        let answer = Answer {
            text: validated.text,
            outcome: validated.outcome,
            sources,
        };

        info!(
            session = %self.session_id,
            k,
            candidates = candidates.len(),
            sources = answer.sources.len(),
            outcome = ?answer.outcome,
            "question answered"
        );

        self.cache.insert(key, answer.clone()).await;
        Ok(answer)
    }

    fn choose_sources(&self, candidates: &[Chunk], selection: &[usize], k: usize) -> Vec<Chunk> {
        let required = self.filter.max_selected.max(1);
        if selection.len() < required {
            warn!(
                session = %self.session_id,
                selected = selection.len(),
                "relevance filter selected too few sources; using unfiltered candidates"
            );
            return renumber(candidates.iter().take(k).cloned().collect());
        }

        renumber(
            selection
                .iter()
                .filter_map(|index| candidates.get(*index).cloned())
                .collect(),
        )
    }
}
