//! Minimal HTTP client for a local Ollama server.
//!
//! Requests are issued once; failures surface to the caller without retry.

use crate::QaError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const BACKEND: &str = "ollama";

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_ctx: usize,
    pub num_thread: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QaError> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<String, QaError> {
        let response = self
            .client
            .post(self.base_url.join("api/generate")?)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
                options,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QaError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("generate with {model} returned {status}: {body}"),
            });
        }

        let parsed: GenerateResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(parsed.response)
    }

    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, QaError> {
        let response = self
            .client
            .post(self.base_url.join("api/embeddings")?)
            .json(&EmbedRequest { model, prompt: text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QaError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("embeddings with {model} returned {}", response.status()),
            });
        }

        let parsed: EmbedResponse = serde_json::from_slice(&response.bytes().await?)?;
        if parsed.embedding.is_empty() {
            return Err(QaError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("embeddings with {model} returned an empty vector"),
            });
        }
        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash_so_joins_keep_prefix() -> Result<(), QaError> {
        let client = OllamaClient::new("http://gpu-box:11434/proxy", Duration::from_secs(5))?;
        assert_eq!(
            client.base_url().join("api/generate")?.as_str(),
            "http://gpu-box:11434/proxy/api/generate"
        );
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = OllamaClient::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(QaError::Url(_))));
    }

    #[test]
    fn generate_request_disables_streaming() -> Result<(), serde_json::Error> {
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3.1:8b",
            prompt: "hello",
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_ctx: 4096,
                num_thread: 8,
            },
        })?;

        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_ctx"], 4096);
        assert_eq!(body["options"]["num_thread"], 8);
        Ok(())
    }
}
