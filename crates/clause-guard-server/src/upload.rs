//! Multipart upload parsing and filename sanitizing.

use axum::{extract::Multipart, http::StatusCode};
use clause_guard_core::DocumentFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::ApiError;

/// Multipart field carrying the document.
pub const DOCUMENT_FIELD: &str = "document";

static DISALLOWED_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("static regex is valid"));

/// A received document whose extension maps to a supported format.
#[derive(Debug)]
pub struct UploadedDocument {
    pub filename: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

/// Reduce a client-supplied filename to a safe ASCII name.
///
/// Accented letters are folded through NFKD, path separators and whitespace
/// runs become `_`, anything outside `[A-Za-z0-9_.-]` is dropped and
/// leading/trailing `.`/`_` are stripped, so `../../etc/passwd` becomes
/// `etc_passwd`.
pub fn secure_filename(raw: &str) -> String {
    let folded: String = raw.nfkd().collect();
    let separated = folded.replace(['/', '\\'], " ");
    let joined = separated.split_whitespace().collect::<Vec<_>>().join("_");
    DISALLOWED_FILENAME_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Pull the `document` field out of a multipart body and validate its name.
pub async fn read_document(
    mut multipart: Multipart,
    limit: usize,
) -> Result<UploadedDocument, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        if field.name() != Some(DOCUMENT_FIELD) {
            continue;
        }
        let filename = secure_filename(field.file_name().unwrap_or_default());
        if filename.is_empty() {
            return Err(ApiError::NoFileSelected);
        }
        let format = DocumentFormat::from_filename(&filename)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|err| multipart_error(err, limit))?;
        if bytes.len() > limit {
            return Err(ApiError::PayloadTooLarge(limit));
        }
        return Ok(UploadedDocument {
            filename,
            format,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::NoFileSelected)
}

fn multipart_error(err: axum::extract::multipart::MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(limit)
    } else {
        ApiError::Validation(err.body_text())
    }
}
