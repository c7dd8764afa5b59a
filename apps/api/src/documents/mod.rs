//! Text extraction for uploaded resumes and job descriptions.
//!
//! Dispatches on file extension: PDF through `pdf-extract`, DOCX through
//! `docx-rs` (one line per paragraph), everything else decoded as UTF-8
//! with a lossy fallback. Extraction is CPU-bound; async callers go through
//! `read_document_text_blocking`, which moves the work onto the blocking pool.

use bytes::Bytes;
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("Failed to read DOCX document: {0}")]
    Docx(String),

    #[error("Text extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    fn from_file_name(file_name: &str) -> Self {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            _ => DocumentFormat::PlainText,
        }
    }
}

/// Returns the text content of an uploaded file.
pub fn read_document_text(file_name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    match DocumentFormat::from_file_name(file_name) {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DocumentError::Pdf(e.to_string())),
        DocumentFormat::Docx => extract_docx_text(bytes),
        DocumentFormat::PlainText => Ok(decode_text(bytes)),
    }
}

/// Same as [`read_document_text`], run on tokio's blocking pool.
pub async fn read_document_text_blocking(
    file_name: String,
    bytes: Bytes,
) -> Result<String, DocumentError> {
    tokio::task::spawn_blocking(move || read_document_text(&file_name, &bytes))
        .await
        .map_err(|e| DocumentError::Task(e.to_string()))?
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn extract_docx_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| DocumentError::Docx(e.to_string()))?;

    let mut out = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            push_paragraph_text(paragraph, &mut out);
            out.push('\n');
        }
    }
    Ok(out.trim_end().to_string())
}

fn push_paragraph_text(paragraph: &Paragraph, out: &mut String) {
    for child in &paragraph.children {
        let ParagraphChild::Run(run) = child else {
            continue;
        };
        for run_child in &run.children {
            match run_child {
                RunChild::Text(t) => out.push_str(&t.text),
                RunChild::Tab(_) => out.push('\t'),
                RunChild::Break(_) => out.push('\n'),
                _ => {}
            }
        }
    }
}
