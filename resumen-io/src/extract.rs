//! Local PDF page-text extraction.

use resumen_core::StatementError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Page separator emitted by the text extractor.
pub const PAGE_BREAK: char = '\x0c';

pub trait PageTextExtractor {
    /// One string per page. Failure is final; callers decide about retries.
    fn extract(&self, pdf: &[u8]) -> Result<Vec<String>, StatementError>;

    fn stats(&self, pdf: &[u8]) -> Result<DocumentStats, StatementError> {
        Ok(DocumentStats::from_pages(&self.extract(pdf)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PageTextExtractor for PdfTextExtractor {
    fn extract(&self, pdf: &[u8]) -> Result<Vec<String>, StatementError> {
        let text = pdf_extract::extract_text_from_mem(pdf)
            .map_err(|e| StatementError::Extraction(format!("pdf text extraction: {e}")))?;
        let pages = split_pages(&text);
        debug!(pages = pages.len(), bytes = pdf.len(), "pdf text extracted");
        Ok(pages)
    }
}

/// Split extracted text on form feeds. A trailing empty page is dropped.
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Document facts recorded with each conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentStats {
    pub pages: usize,
}

impl DocumentStats {
    pub fn from_pages(pages: &[String]) -> Self {
        Self { pages: pages.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_on_form_feed() {
        let pages = split_pages("SALDO ANTERIOR 1,00\n\x0c02/05/24 PAGO 1,00 0,00\n\x0c");
        assert_eq!(pages.len(), 2);
        assert!(pages[1].starts_with("02/05/24"));
        assert_eq!(DocumentStats::from_pages(&pages).pages, 2);
    }

    #[test]
    fn test_single_page_without_break() {
        assert_eq!(split_pages("solo texto"), vec!["solo texto".to_string()]);
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let err = PdfTextExtractor.extract(b"not a pdf").unwrap_err();
        assert!(matches!(err, StatementError::Extraction(_)));
    }

    struct FixedPages(Vec<&'static str>);

    impl PageTextExtractor for FixedPages {
        fn extract(&self, _pdf: &[u8]) -> Result<Vec<String>, StatementError> {
            Ok(self.0.iter().map(|p| p.to_string()).collect())
        }
    }

    #[test]
    fn test_stats_counts_extracted_pages() {
        let stats = FixedPages(vec!["uno", "dos", "tres"]).stats(b"").unwrap();
        assert_eq!(stats, DocumentStats { pages: 3 });
    }
}
