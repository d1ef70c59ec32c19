//! Text extraction for uploaded documents.
//!
//! Turns a stored file into a flat UTF-8 string. PDF handling lives in
//! the `pdf` submodule; plain text and markdown are read as-is.

mod pdf;

use std::path::Path;

use crate::core::errors::RagError;

/// Declared type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

impl DocumentKind {
    /// Parse a declared type or file extension ("pdf", ".md", "TXT", ...).
    pub fn from_declared(declared: &str) -> Result<Self, RagError> {
        match declared.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "txt" | "text" => Ok(DocumentKind::Text),
            "md" | "markdown" => Ok(DocumentKind::Markdown),
            other => Err(RagError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Extract the full text content of a document.
///
/// Fails with `ExtractionFailed` when the file is unreadable or yields
/// no extractable text (e.g. a scanned image-only PDF).
pub async fn extract_text(path: &Path, kind: DocumentKind) -> Result<String, RagError> {
    let text = match kind {
        DocumentKind::Text | DocumentKind::Markdown => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RagError::ExtractionFailed(format!("{}: {e}", path.display())))?,
        DocumentKind::Pdf => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| RagError::ExtractionFailed(format!("{}: {e}", path.display())))?;
            // lopdf parsing is CPU-bound; keep it off the async workers.
            tokio::task::spawn_blocking(move || pdf::extract_from_bytes(&bytes))
                .await
                .map_err(RagError::internal)??
        }
    };

    if text.trim().is_empty() {
        return Err(RagError::ExtractionFailed(format!(
            "no extractable text in {}",
            path.display()
        )));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn declared_type_parsing() {
        assert_eq!(DocumentKind::from_declared("pdf").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_declared(".PDF").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_declared("txt").unwrap(), DocumentKind::Text);
        assert_eq!(
            DocumentKind::from_declared("markdown").unwrap(),
            DocumentKind::Markdown
        );

        let err = DocumentKind::from_declared("docx").unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn reads_plain_text_files() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all("Photosynthesis converts light into energy.".as_bytes())
            .unwrap();

        let text = extract_text(tmp.path(), DocumentKind::Text).await.unwrap();
        assert!(text.contains("Photosynthesis"));
    }

    #[tokio::test]
    async fn empty_file_is_an_extraction_failure() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = extract_text(tmp.path(), DocumentKind::Markdown)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_extraction_failure() {
        let err = extract_text(Path::new("/nonexistent/notes.txt"), DocumentKind::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::ExtractionFailed(_)));
    }
}
