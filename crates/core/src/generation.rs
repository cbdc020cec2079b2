use crate::config::ModelConfig;
use crate::ollama::{GenerateOptions, OllamaClient};
use crate::traits::{GenerationBackend, GenerationRequest};
use crate::QaError;
use async_trait::async_trait;

/// A model served by Ollama, bound to one configuration.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: OllamaClient,
    config: ModelConfig,
}

impl OllamaBackend {
    pub fn new(client: OllamaClient, config: ModelConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, QaError> {
        self.client
            .generate(
                &self.config.model,
                &request.prompt,
                GenerateOptions {
                    temperature: request.temperature,
                    num_ctx: request.context_window,
                    num_thread: request.thread_hint,
                },
            )
            .await
    }
}
