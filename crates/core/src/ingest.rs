use crate::extractor::extract_page_texts;
use crate::models::{
    DocumentRecord, FileKind, Metadata, UploadedFile, META_CHECKSUM, META_FILE_TYPE, META_PAGE,
    META_SOURCE,
};
use crate::IngestError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

pub struct IngestionReport {
    pub records: Vec<DocumentRecord>,
    pub skipped_files: Vec<SkippedFile>,
    pub loaded_at: DateTime<Utc>,
}

/// Converts uploads into page/document records.
///
/// Files with an unrecognized extension are ignored without a trace in the
/// report. Recognized files that fail to parse are listed in `skipped_files`.
pub fn load(files: &[UploadedFile]) -> IngestionReport {
    let mut records = Vec::new();
    let mut skipped_files = Vec::new();

    for file in files {
        let Some(kind) = FileKind::from_name(&file.name) else {
            debug!(file = %file.name, "ignoring unsupported file type");
            continue;
        };

        match load_one(kind, file) {
            Ok(file_records) => records.extend(file_records),
            Err(error) => {
                warn!(file = %file.name, reason = %error, "skipped document");
                skipped_files.push(SkippedFile {
                    name: file.name.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    IngestionReport {
        records,
        skipped_files,
        loaded_at: Utc::now(),
    }
}

fn load_one(kind: FileKind, file: &UploadedFile) -> Result<Vec<DocumentRecord>, IngestError> {
    let checksum = digest_bytes(&file.bytes);
    let pages = extract_page_texts(kind, file)?;

    Ok(pages
        .into_iter()
        .map(|page| {
            let mut metadata = Metadata::new();
            metadata.insert(META_SOURCE.to_string(), file.name.clone());
            metadata.insert(META_FILE_TYPE.to_string(), kind.as_str().to_string());
            metadata.insert(META_CHECKSUM.to_string(), checksum.clone());
            if let Some(number) = page.number {
                metadata.insert(META_PAGE.to_string(), number.to_string());
            }

            DocumentRecord {
                text: page.text,
                metadata,
            }
        })
        .collect())
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(FileKind::from_name)
            .is_some();

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Reads every supported document under `folder` and loads it.
pub fn load_folder(folder: &Path) -> Result<IngestionReport, IngestError> {
    let paths = discover_document_files(folder);

    if paths.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pdf, docx or txt files found in {}",
            folder.display()
        )));
    }

    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
            .to_string();
        uploads.push(UploadedFile::new(name, fs::read(&path)?));
    }

    Ok(load(&uploads))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn unsupported_extensions_are_silently_ignored() {
        let files = vec![
            UploadedFile::new("figure.png", vec![0u8, 1, 2]),
            UploadedFile::new("abstract.txt", "Enzymes lower activation energy.".as_bytes()),
        ];

        let report = load(&files);
        assert_eq!(report.records.len(), 1);
        assert!(report.skipped_files.is_empty());
        assert_eq!(
            report.records[0].metadata.get(META_SOURCE).map(String::as_str),
            Some("abstract.txt")
        );
        assert_eq!(
            report.records[0].metadata.get(META_FILE_TYPE).map(String::as_str),
            Some("txt")
        );
        assert!(report.records[0].metadata.get(META_PAGE).is_none());
    }

    #[test]
    fn unreadable_documents_are_reported_not_fatal() {
        let files = vec![
            UploadedFile::new("broken.pdf", b"%PDF-1.4\n%broken".to_vec()),
            UploadedFile::new("ok.txt", "Mitochondria produce ATP.".as_bytes()),
        ];

        let report = load(&files);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_files[0].name, "broken.pdf");
    }

    #[test]
    fn checksum_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }

    #[test]
    fn discover_document_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.txt")).and_then(|mut file| file.write_all(b"text"))?;
        File::create(nested.join("c.docx")).and_then(|mut file| file.write_all(b"docx"))?;
        File::create(nested.join("d.csv")).and_then(|mut file| file.write_all(b"a,b"))?;

        let files = discover_document_files(base);
        assert_eq!(files.len(), 3);
        Ok(())
    }

    #[test]
    fn load_folder_fails_without_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("image.png"), b"png")?;
        let result = load_folder(dir.path());
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn load_folder_reads_text_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("cells.txt"), "The nucleus stores genetic material.")?;

        let report = load_folder(dir.path())?;
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].text, "The nucleus stores genetic material.");
        Ok(())
    }
}
