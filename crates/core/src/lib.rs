pub mod cache;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod ollama;
pub mod pipeline;
pub mod retriever;
pub mod synthesizer;
pub mod traits;
pub mod validator;

pub use cache::{AnswerCache, CacheKey, CacheStats};
pub use chunking::{build_chunks, chunk_by_paragraph, normalize_whitespace, ChunkingConfig};
pub use config::{
    ModelConfig, PipelineConfig, DEFAULT_FAST_MODEL, DEFAULT_PRIMARY_MODEL, DEFAULT_TOP_K,
};
pub use embeddings::{
    Embedder, EmbeddingBackend, HashedNgramEmbedder, OllamaEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, QaError};
pub use extractor::{extract_page_texts, PageText, TextExtractor};
pub use filter::{parse_selection, RelevanceFilter};
pub use generation::OllamaBackend;
pub use index::{IndexBuilder, InMemoryVectorIndex};
pub use ingest::{discover_document_files, load, load_folder, IngestionReport, SkippedFile};
pub use models::{
    Answer, AnswerOutcome, CandidateSet, Chunk, DocumentRecord, FileKind, IngestionOptions,
    Metadata, Query, UploadedFile,
};
pub use ollama::{OllamaClient, DEFAULT_OLLAMA_URL};
pub use pipeline::QaPipeline;
pub use retriever::retrieve;
pub use synthesizer::AnswerSynthesizer;
pub use traits::{GenerationBackend, GenerationRequest, VectorIndex};
pub use validator::{GroundingValidator, ValidatedAnswer, BLOCKED_MESSAGE, REFUSAL_MESSAGE};
