//! Text extraction for uploaded documents.
//!
//! Each supported format implements [`TextExtractor`]; [`DocumentFormat`]
//! picks the implementation from a filename's extension so the scorer only
//! ever sees plain text.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod docx;
mod pdf;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;

/// Turns raw file bytes into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Errors raised while selecting or running an extractor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error(
        "unsupported file extension `{0}` (expected one of: {})",
        DocumentFormat::EXTENSIONS.join(", ")
    )]
    UnsupportedExtension(String),
    #[error("failed to read PDF: {0}")]
    Pdf(String),
    #[error("failed to read DOCX: {0}")]
    Docx(String),
}

/// Document formats accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Accepted extensions, lower-case and without the leading dot.
    pub const EXTENSIONS: [&'static str; 3] = ["txt", "pdf", "docx"];

    /// Look up the format for an extension without the leading dot, ignoring case.
    pub fn from_extension(extension: &str) -> Result<Self, ExtractError> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Ok(Self::PlainText),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            other => Err(ExtractError::UnsupportedExtension(other.to_string())),
        }
    }

    /// Look up the format from a filename or path.
    pub fn from_filename(name: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let extension = name
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    pub fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            Self::PlainText => &PlainTextExtractor,
            Self::Pdf => &PdfExtractor,
            Self::Docx => &DocxExtractor,
        }
    }

    pub fn extract_text(self, bytes: &[u8]) -> Result<String, ExtractError> {
        self.extractor().extract_text(bytes)
    }
}

/// UTF-8 decoding that drops invalid byte sequences instead of failing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut text = String::with_capacity(bytes.len());
        for chunk in bytes.utf8_chunks() {
            text.push_str(chunk.valid());
        }
        Ok(text)
    }
}
