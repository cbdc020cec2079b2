use crate::ollama::OllamaClient;
use crate::QaError;
use async_trait::async_trait;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 256;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, QaError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QaError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Local, deterministic embedder hashing word-bounded character trigrams into buckets.
#[derive(Debug, Clone, Copy)]
pub struct HashedNgramEmbedder {
    pub dimensions: usize,
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashedNgramEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars().flat_map(char::to_lowercase))
                .chain(std::iter::once(' '))
                .collect();

            for window in padded.windows(3) {
                let bucket = (fnv1a(window) % vector.len() as u64) as usize;
                vector[bucket] += 1.0;
            }
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

fn fnv1a(chars: &[char]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    let mut buffer = [0u8; 4];
    for c in chars {
        for byte in c.encode_utf8(&mut buffer).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}

#[async_trait]
impl Embedder for HashedNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, QaError> {
        Ok(self.embed_sync(text))
    }
}

pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, QaError> {
        let vector = self.client.embed(&self.model, text).await?;
        check_dimensions(&self.model, self.dimensions, vector)
    }
}

/// Rejects vectors whose length differs from the configured dimensions.
fn check_dimensions(model: &str, expected: usize, vector: Vec<f32>) -> Result<Vec<f32>, QaError> {
    if vector.len() != expected {
        return Err(QaError::BackendResponse {
            backend: format!("ollama embeddings ({model})"),
            details: format!(
                "embedding has {} dimensions, expected {expected}",
                vector.len()
            ),
        });
    }
    Ok(vector)
}

/// Runtime choice between the local hashing embedder and an Ollama embedding model.
pub enum EmbeddingBackend {
    Hashed(HashedNgramEmbedder),
    Ollama(OllamaEmbedder),
}

#[async_trait]
impl Embedder for EmbeddingBackend {
    fn dimensions(&self) -> usize {
        match self {
            Self::Hashed(embedder) => embedder.dimensions(),
            Self::Ollama(embedder) => embedder.dimensions(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, QaError> {
        match self {
            Self::Hashed(embedder) => embedder.embed(text).await,
            Self::Ollama(embedder) => embedder.embed(text).await,
        }
    }
}
