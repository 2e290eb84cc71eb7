//! Plain-text extraction from report files.

use std::path::Path;

use tracing::{debug, instrument};

use simreport_shared::{Result, SimReportError};

/// Turns a report file into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Default extractor: PDFs via `pdf-extract`, `.txt`/`.md` read verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentTextExtractor;

impl TextExtractor for DocumentTextExtractor {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn extract(&self, path: &Path) -> Result<String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let text = match ext.as_str() {
            "pdf" => pdf_extract::extract_text(path).map_err(|e| {
                SimReportError::Extraction(format!(
                    "failed to extract text from {}: {e}",
                    path.display()
                ))
            })?,
            "txt" | "md" => std::fs::read_to_string(path).map_err(|e| {
                SimReportError::Extraction(format!("failed to read {}: {e}", path.display()))
            })?,
            other => {
                return Err(SimReportError::Extraction(format!(
                    "unsupported document type '{other}': {}",
                    path.display()
                )));
            }
        };

        if text.trim().is_empty() {
            return Err(SimReportError::Extraction(format!(
                "no text extracted from {}",
                path.display()
            )));
        }

        debug!(chars = text.chars().count(), "extracted report text");
        Ok(text)
    }
}
