use crate::error::IngestError;
use crate::models::{FileKind, UploadedFile};
use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use lopdf::Document;

#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number for paginated formats, `None` otherwise.
    pub number: Option<u32>,
    pub text: String,
}

pub trait TextExtractor {
    fn extract_pages(&self, file: &UploadedFile) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, file: &UploadedFile) -> Result<Vec<PageText>, IngestError> {
        let document = Document::load_mem(&file.bytes)
            .map_err(|error| IngestError::PdfParse(format!("{}: {error}", file.name)))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(format!("{}: {error}", file.name)))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: Some(page_no),
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                file.name
            )));
        }

        Ok(pages)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxTextExtractor;

impl TextExtractor for DocxTextExtractor {
    fn extract_pages(&self, file: &UploadedFile) -> Result<Vec<PageText>, IngestError> {
        let docx = docx_rs::read_docx(&file.bytes)
            .map_err(|error| IngestError::DocxParse(format!("{}: {error}", file.name)))?;

        let mut text = String::new();
        for child in docx.document.children {
            if let DocumentChild::Paragraph(paragraph) = child {
                for paragraph_child in paragraph.children {
                    if let ParagraphChild::Run(run) = paragraph_child {
                        for run_child in run.children {
                            if let RunChild::Text(fragment) = run_child {
                                text.push_str(&fragment.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }

        Ok(single_page(text))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_pages(&self, file: &UploadedFile) -> Result<Vec<PageText>, IngestError> {
        let text = std::str::from_utf8(&file.bytes).map_err(|error| IngestError::TextDecode {
            file: file.name.clone(),
            details: error.to_string(),
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        Ok(single_page(text.to_string()))
    }
}

fn single_page(text: String) -> Vec<PageText> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![PageText { number: None, text }]
    }
}

pub fn extract_page_texts(
    kind: FileKind,
    file: &UploadedFile,
) -> Result<Vec<PageText>, IngestError> {
    match kind {
        FileKind::Pdf => PdfTextExtractor.extract_pages(file),
        FileKind::Docx => DocxTextExtractor.extract_pages(file),
        FileKind::Text => PlainTextExtractor.extract_pages(file),
    }
}
