use crate::traits::GenerationRequest;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_FAST_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_PRIMARY_MODEL: &str = "llama3.1:8b";

/// Tokens kept free in the context window for the model's answer.
const ANSWER_RESERVE_TOKENS: usize = 1_024;
/// Rough characters-per-token ratio used to size the context window.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub min_context: usize,
    pub max_context: usize,
    pub thread_hint: usize,
}

impl ModelConfig {
    /// Low-context configuration for the relevance filter pass.
    pub fn fast(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            min_context: 2_048,
            max_context: 2_048,
            thread_hint: default_thread_hint(),
        }
    }

    /// Larger-context configuration for answer synthesis.
    pub fn primary(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            min_context: 2_048,
            max_context: 8_192,
            thread_hint: default_thread_hint(),
        }
    }

    /// Context window that fits `prompt` plus room for the answer, within this model's bounds.
    pub fn context_window_for(&self, prompt: &str) -> usize {
        let estimate = prompt.chars().count().div_ceil(CHARS_PER_TOKEN) + ANSWER_RESERVE_TOKENS;
        estimate
            .max(self.min_context)
            .min(self.max_context.max(self.min_context))
    }

    pub fn request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest {
            context_window: self.context_window_for(&prompt),
            prompt,
            temperature: self.temperature,
            thread_hint: self.thread_hint,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::primary(DEFAULT_PRIMARY_MODEL)
    }
}

pub fn default_thread_hint() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub default_k: usize,
    /// Characters of each candidate shown to the relevance filter.
    pub summary_chars: usize,
    /// Characters of each source placed in the synthesis prompt.
    pub max_source_chars: usize,
    pub max_selected: usize,
    pub fast: ModelConfig,
    pub primary: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_k: DEFAULT_TOP_K,
            summary_chars: 300,
            max_source_chars: 1_500,
            max_selected: 2,
            fast: ModelConfig::fast(DEFAULT_FAST_MODEL),
            primary: ModelConfig::primary(DEFAULT_PRIMARY_MODEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prompt_gets_minimum_context() {
        let config = ModelConfig::primary("m");
        assert_eq!(config.context_window_for("short"), 2_048);
    }

    #[test]
    fn context_grows_with_prompt_up_to_max() {
        let config = ModelConfig::primary("m");
        let medium = "x".repeat(16_000);
        assert_eq!(config.context_window_for(&medium), 4_000 + 1_024);

        let huge = "x".repeat(100_000);
        assert_eq!(config.context_window_for(&huge), 8_192);
    }

    #[test]
    fn fast_model_context_is_fixed() {
        let config = ModelConfig::fast("m");
        assert_eq!(config.context_window_for(&"x".repeat(50_000)), 2_048);
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let config = ModelConfig {
            min_context: 4_096,
            max_context: 1_024,
            ..ModelConfig::fast("m")
        };
        assert_eq!(config.context_window_for("hi"), 4_096);
    }

    #[test]
    fn request_carries_model_settings() {
        let config = ModelConfig::fast("m");
        let request = config.request("prompt".to_string());
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.context_window, 2_048);
        assert_eq!(request.thread_hint, config.thread_hint);
        assert_eq!(request.prompt, "prompt");
    }

    #[test]
    fn pipeline_defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_k, 5);
        assert_eq!(config.max_selected, 2);
        assert_eq!(config.fast.model, DEFAULT_FAST_MODEL);
        assert_eq!(config.primary.model, DEFAULT_PRIMARY_MODEL);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() -> Result<(), serde_json::Error> {
        let config: PipelineConfig = serde_json::from_str(r#"{"default_k": 8}"#)?;
        assert_eq!(config.default_k, 8);
        assert_eq!(config.max_source_chars, 1_500);
        Ok(())
    }
}
