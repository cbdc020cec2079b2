use crate::config::PipelineConfig;
use crate::models::Chunk;
use crate::traits::GenerationBackend;
use crate::validator::REFUSAL_MESSAGE;
use crate::QaError;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct AnswerSynthesizer {
    pub max_source_chars: usize,
}

impl Default for AnswerSynthesizer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl AnswerSynthesizer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_source_chars: config.max_source_chars,
        }
    }

    /// `[Source i]` blocks in the given order, each truncated to `max_source_chars`.
    pub fn build_context(&self, sources: &[Chunk]) -> String {
        sources
            .iter()
            .enumerate()
            .map(|(position, chunk)| {
                let text: String = chunk.text.chars().take(self.max_source_chars).collect();
                format!("[Source {}]\n{}", position + 1, text)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn build_prompt(&self, question: &str, sources: &[Chunk]) -> String {
        format!(
            r#"You are an academic assistant answering questions about scientific documents.

STRICT RULES:
1. Use ONLY the information in the sources below.
2. Every factual claim MUST carry an inline citation in the form [Source X].
3. If the sources do not contain enough information, respond exactly with: "{refusal}"
4. Never use outside knowledge.
5. Maintain a precise, academic tone.

STRUCTURE YOUR ANSWER IN FOUR PARTS:
1. Definition / core statement
2. Description or mechanism
3. Key implications or conclusions
4. Limitations of the available information

SOURCES:
{context}

QUESTION:
{question}

ANSWER (academic, precise, with [Source X] citations):
"#,
            refusal = REFUSAL_MESSAGE,
            context = self.build_context(sources),
        )
    }

    /// Raw model output for `question` grounded on `sources`. Citations are not checked here.
    pub async fn synthesize<B>(
        &self,
        backend: &B,
        question: &str,
        sources: &[Chunk],
    ) -> Result<String, QaError>
    where
        B: GenerationBackend + Sync,
    {
        let request = backend.config().request(self.build_prompt(question, sources));
        info!(
            model = %backend.config().model,
            sources = sources.len(),
            context_window = request.context_window,
            "synthesizing answer"
        );

        backend.generate(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::models::Metadata;
    use crate::traits::GenerationRequest;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoBackend {
        config: ModelConfig,
        seen: Mutex<Option<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        fn config(&self) -> &ModelConfig {
            &self.config
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, QaError> {
            if let Ok(mut seen) = self.seen.lock() {
                *seen = Some(request.clone());
            }
            Ok("  raw text kept verbatim \n".to_string())
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_index: 4,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn context_renumbers_sources_in_given_order() {
        let synthesizer = AnswerSynthesizer::default();
        let context = synthesizer.build_context(&[chunk("second best"), chunk("best")]);
        assert_eq!(context, "[Source 1]\nsecond best\n\n[Source 2]\nbest");
    }

    #[test]
    fn long_sources_are_truncated() {
        let synthesizer = AnswerSynthesizer { max_source_chars: 5 };
        let context = synthesizer.build_context(&[chunk("abcdefghij")]);
        assert_eq!(context, "[Source 1]\nabcde");
    }

    #[test]
    fn prompt_states_rules_structure_and_question() {
        let synthesizer = AnswerSynthesizer::default();
        let prompt = synthesizer.build_prompt("How do enzymes work?", &[chunk("Enzymes bind substrates.")]);

        assert!(prompt.starts_with("You are an academic assistant"));
        assert!(prompt.contains("Use ONLY the information in the sources below."));
        assert!(prompt.contains("[Source X]"));
        assert!(prompt.contains(REFUSAL_MESSAGE));
        assert!(prompt.contains("Never use outside knowledge."));
        assert!(prompt.contains("academic tone"));
        assert!(prompt.contains("1. Definition / core statement"));
        assert!(prompt.contains("2. Description or mechanism"));
        assert!(prompt.contains("3. Key implications or conclusions"));
        assert!(prompt.contains("4. Limitations of the available information"));
        assert!(prompt.contains("[Source 1]\nEnzymes bind substrates."));

        let context_at = prompt.find("SOURCES:").unwrap_or(usize::MAX);
        let question_at = prompt.find("How do enzymes work?").unwrap_or(0);
        assert!(context_at < question_at);
    }

    #[tokio::test]
    async fn synthesize_returns_raw_text_at_temperature_zero() -> Result<(), QaError> {
        let backend = EchoBackend {
            config: ModelConfig::primary("big"),
            seen: Mutex::new(None),
        };
        let synthesizer = AnswerSynthesizer::default();

        let raw = synthesizer.synthesize(&backend, "q", &[chunk("text")]).await?;
        assert_eq!(raw, "  raw text kept verbatim \n");

        let seen = backend.seen.lock().expect("request log lock").clone();
        let request = seen.expect("backend should have been called");
        assert_eq!(request.temperature, 0.0);
        assert!(request.context_window >= 2_048);
        Ok(())
    }
}
