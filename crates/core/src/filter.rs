//! Fast relevance pass that narrows the candidate set before synthesis.
//!
//! The fast model sees short summaries of each candidate and answers with a
//! comma-separated list of source numbers. Its reply is parsed leniently: anything
//! that is not a usable index is dropped, so a bad reply degrades to an empty
//! selection and the pipeline falls back to the unfiltered candidates.

use crate::config::PipelineConfig;
use crate::models::Chunk;
use crate::traits::GenerationBackend;
use crate::QaError;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RelevanceFilter {
    pub summary_chars: usize,
    pub max_selected: usize,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RelevanceFilter {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            summary_chars: config.summary_chars,
            max_selected: config.max_selected,
        }
    }

    pub fn build_prompt(&self, question: &str, candidates: &[Chunk]) -> String {
        let summaries = candidates
            .iter()
            .enumerate()
            .map(|(position, chunk)| {
                format!(
                    "[Source {}] {}",
                    position + 1,
                    summarize(&chunk.text, self.summary_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You select the sources that best answer a question.\n\
             \n\
             Question: {question}\n\
             \n\
             Sources:\n\
             {summaries}\n\
             \n\
             Reply with the numbers of the {max} most relevant sources as a comma-separated list, for example: 1,3\n\
             Output only the numbers. Do not write words, explanations or brackets.",
            max = self.max_selected,
        )
    }

    /// 0-based indices into `candidates` chosen by the fast model, at most `max_selected`.
    pub async fn select<B>(
        &self,
        backend: &B,
        question: &str,
        candidates: &[Chunk],
    ) -> Result<Vec<usize>, QaError>
    where
        B: GenerationBackend + Sync,
    {
        let request = backend.config().request(self.build_prompt(question, candidates));
        let raw = backend.generate(&request).await?;
        let selection = parse_selection(&raw, candidates.len(), self.max_selected);

        debug!(raw = %raw.trim(), ?selection, "relevance filter reply");
        Ok(selection)
    }
}

/// First `max_chars` characters of `text` on a single line.
pub fn summarize(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Parses a reply such as `"2, 5"` into 0-based indices below `candidate_count`.
///
/// Tokens that are not positive integers are skipped, the remaining distinct numbers
/// are capped at `max_selected` in order of appearance, and only then are indices
/// outside the candidate range discarded. A reply that spends its cap on bad numbers
/// therefore selects fewer sources. Never fails.
pub fn parse_selection(raw: &str, candidate_count: usize, max_selected: usize) -> Vec<usize> {
    let mut numbers: Vec<usize> = Vec::new();
    for token in raw.split(',') {
        let Ok(number) = token.trim().parse::<usize>() else {
            continue;
        };
        if number > 0 && !numbers.contains(&number) {
            numbers.push(number);
        }
    }

    numbers
        .into_iter()
        .take(max_selected)
        .map(|number| number - 1)
        .filter(|index| *index < candidate_count)
        .collect()
}
