use std::panic::{self, AssertUnwindSafe};

use pdf_extract::extract_text_from_mem;
use tracing::warn;

use super::{ExtractError, TextExtractor};

/// PDF text extraction via `pdf-extract`; page texts are concatenated in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        // pdf-extract panics on some malformed inputs instead of returning an error.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| extract_text_from_mem(bytes)));
        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(err)) => {
                let message = err.to_string();
                if message.to_lowercase().contains("encrypt") {
                    return Err(ExtractError::Pdf(
                        "document is encrypted or password protected".to_string(),
                    ));
                }
                Err(ExtractError::Pdf(message))
            }
            Err(_) => {
                warn!(len = bytes.len(), "pdf decoder panicked");
                Err(ExtractError::Pdf("malformed PDF document".to_string()))
            }
        }
    }
}
