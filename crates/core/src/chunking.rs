use crate::error::IngestError;
use crate::models::{
    Chunk, DocumentRecord, IngestionOptions, META_CHUNK_ID, META_CHUNK_INDEX, META_PAGE,
    META_SOURCE,
};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub min_chars: usize,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
            min_chars: value.min_chunk_chars,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than max size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Packs paragraphs into chunks of at most `max_chars` characters and hard-splits
/// any paragraph that is longer, with `overlap_chars` of carry-over between pieces.
pub fn chunk_by_paragraph(text: &str, config: ChunkingConfig) -> Vec<String> {
    let paragraphs = text
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(normalize_whitespace)
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>();

    let mut packed = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        if current.is_empty() {
            current = paragraph;
            continue;
        }

        if char_len(&current) + char_len(&paragraph) + 2 <= config.max_chars {
            current.push_str("\n\n");
            current.push_str(&paragraph);
        } else {
            packed.push(std::mem::take(&mut current));
            current = paragraph;
        }
    }

    if !current.is_empty() {
        packed.push(current);
    }

    let mut pieces = Vec::new();
    for chunk in packed {
        if char_len(&chunk) <= config.max_chars {
            pieces.push(chunk);
            continue;
        }

        let chars: Vec<char> = chunk.chars().collect();
        let step = config.max_chars.saturating_sub(config.overlap_chars).max(1);
        let mut start = 0;
        while start < chars.len() {
            let end = (start + config.max_chars).min(chars.len());
            pieces.push(chars[start..end].iter().collect::<String>().trim().to_string());
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }

    let only_piece = pieces.len() == 1;
    pieces
        .into_iter()
        .filter(|piece| !piece.is_empty() && (only_piece || char_len(piece) >= config.min_chars))
        .collect()
}

/// Splits one record into chunks that inherit its metadata.
///
/// `global_index` numbers chunks across the whole corpus; the returned cursor is
/// the next free index.
pub fn build_chunks(
    record: &DocumentRecord,
    options: &IngestionOptions,
    global_index: u64,
) -> Result<(Vec<Chunk>, u64), IngestError> {
    let config = ChunkingConfig::from(options);
    config.validate()?;

    let mut chunks = Vec::new();
    let mut cursor = global_index;

    for text in chunk_by_paragraph(&record.text, config) {
        let chunk_id = make_chunk_id(
            record.metadata.get(META_SOURCE).map(String::as_str).unwrap_or_default(),
            record.metadata.get(META_PAGE).map(String::as_str).unwrap_or_default(),
            cursor,
            &text,
        );

        let mut metadata = record.metadata.clone();
        metadata.insert(META_CHUNK_INDEX.to_string(), cursor.to_string());
        metadata.insert(META_CHUNK_ID.to_string(), chunk_id);

        chunks.push(Chunk {
            text,
            source_index: 0,
            metadata,
        });

        cursor = cursor.saturating_add(1);
    }

    Ok((chunks, cursor))
}

fn make_chunk_id(source: &str, page: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(page.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn config(max_chars: usize, overlap_chars: usize, min_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
            min_chars,
        }
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof\u{a0}  spacing";
        assert_eq!(normalize_whitespace(input), "A lot of spacing");
    }

    #[test]
    fn short_paragraphs_are_packed_together() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = chunk_by_paragraph(text, config(100, 10, 5));
        assert_eq!(chunks, vec!["First paragraph here.\n\nSecond paragraph here.".to_string()]);
    }

    #[test]
    fn long_paragraph_is_split_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_by_paragraph(text, config(10, 2, 1));
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ijklmnopqr");
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
        assert!(chunks.last().is_some_and(|chunk| chunk.ends_with('z')));
    }

    #[test]
    fn tiny_fragments_are_dropped_unless_alone() {
        let alone = chunk_by_paragraph("Hi.", config(100, 10, 20));
        assert_eq!(alone, vec!["Hi.".to_string()]);

        let text = format!("{}\n\nok", "x".repeat(30));
        let mixed = chunk_by_paragraph(&text, config(31, 5, 20));
        assert_eq!(mixed, vec!["x".repeat(30)]);
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        let options = IngestionOptions {
            chunk_max_chars: 10,
            chunk_overlap_chars: 10,
            min_chunk_chars: 1,
        };
        let record = DocumentRecord {
            text: "text".to_string(),
            metadata: Metadata::new(),
        };
        assert!(matches!(
            build_chunks(&record, &options, 0),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn chunks_inherit_metadata_and_advance_cursor() -> Result<(), IngestError> {
        let mut metadata = Metadata::new();
        metadata.insert(META_SOURCE.to_string(), "paper.pdf".to_string());
        metadata.insert(META_PAGE.to_string(), "3".to_string());
        let record = DocumentRecord {
            text: format!("{}\n\n{}", "a".repeat(40), "b".repeat(40)),
            metadata,
        };
        let options = IngestionOptions {
            chunk_max_chars: 50,
            chunk_overlap_chars: 5,
            min_chunk_chars: 10,
        };

        let (chunks, cursor) = build_chunks(&record, &options, 7)?;
        assert_eq!(chunks.len(), 2);
        assert_eq!(cursor, 9);
        assert_eq!(chunks[0].metadata.get(META_PAGE).map(String::as_str), Some("3"));
        assert_eq!(chunks[1].metadata.get(META_CHUNK_INDEX).map(String::as_str), Some("8"));
        assert_ne!(
            chunks[0].metadata.get(META_CHUNK_ID),
            chunks[1].metadata.get(META_CHUNK_ID)
        );
        assert!(chunks.iter().all(|chunk| chunk.source_index == 0));
        Ok(())
    }
}
