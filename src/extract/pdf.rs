//! PDF text extraction via lopdf, page by page.

use lopdf::Document;
use tracing::{debug, warn};

use crate::core::errors::RagError;

/// Page-boundary marker inserted between extracted pages.
pub const PAGE_BREAK: char = '\u{0C}';

/// Extract text from PDF bytes.
///
/// Pages are extracted individually so one malformed page does not sink
/// the whole document; failed pages are logged and skipped. Fails only
/// when the document itself cannot be parsed or no page yields text.
pub fn extract_from_bytes(bytes: &[u8]) -> Result<String, RagError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| RagError::ExtractionFailed(format!("pdf parse: {e}")))?;

    let pages = doc.get_pages();
    let mut out = String::new();
    let mut extracted_pages = 0usize;

    for (&page_num, _) in &pages {
        match doc.extract_text(&[page_num]) {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if !out.is_empty() {
                    out.push(PAGE_BREAK);
                    out.push('\n');
                }
                out.push_str(trimmed);
                extracted_pages += 1;
            }
            Err(e) => {
                warn!("skipping pdf page {page_num}: {e}");
            }
        }
    }

    debug!(
        "extracted {extracted_pages}/{} pdf pages, {} chars",
        pages.len(),
        out.len()
    );

    if out.trim().is_empty() {
        return Err(RagError::ExtractionFailed(
            "no extractable text in any page".to_string(),
        ));
    }

    Ok(out)
}
