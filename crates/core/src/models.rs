use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance attached to records and chunks (`source`, `page`, `checksum`, ...).
pub type Metadata = BTreeMap<String, String>;

pub const META_SOURCE: &str = "source";
pub const META_PAGE: &str = "page";
pub const META_FILE_TYPE: &str = "file_type";
pub const META_CHECKSUM: &str = "checksum";
pub const META_CHUNK_INDEX: &str = "chunk_index";
pub const META_CHUNK_ID: &str = "chunk_id";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Docx,
    Text,
}

impl FileKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Text => "txt",
        }
    }
}

/// An uploaded file handed to the ingestor.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A page (PDF) or whole document (DOCX, TXT) worth of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// 1-based position inside one candidate set or source list; 0 while stored in the index.
    pub source_index: usize,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn source_name(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).map(String::as_str)
    }

    pub fn page(&self) -> Option<&str> {
        self.metadata.get(META_PAGE).map(String::as_str)
    }
}

/// Renumbers chunks 1..=n in their current order.
pub fn renumber(chunks: Vec<Chunk>) -> Vec<Chunk> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(position, chunk)| Chunk {
            source_index: position + 1,
            ..chunk
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Query {
    pub question: String,
    pub k: usize,
}

impl Query {
    pub fn new(question: impl Into<String>, k: usize) -> Self {
        Self {
            question: question.into(),
            k,
        }
    }
}

/// Similarity-ordered retrieval result, numbered for citation within one run.
pub type CandidateSet = Vec<Chunk>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnswerOutcome {
    Grounded,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub text: String,
    pub outcome: AnswerOutcome,
    /// The chunks actually placed in the prompt, numbered as the model saw them.
    pub sources: Vec<Chunk>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub min_chunk_chars: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 1_000,
            chunk_overlap_chars: 200,
            min_chunk_chars: 20,
        }
    }
}
