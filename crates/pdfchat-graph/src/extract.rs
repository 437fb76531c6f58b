use lopdf::Document;

/// PDF collaborator: bytes in, plain text out.
///
/// Extraction never fails outright. Unreadable input degrades to empty text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> String;
}

/// Page-by-page text extraction backed by `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> String {
        let document = match Document::load_mem(bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(error = %e, bytes = bytes.len(), "unreadable PDF, using empty text");
                return String::new();
            }
        };

        let mut text = String::new();
        for page_number in document.get_pages().keys() {
            match document.extract_text(&[*page_number]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "page text extraction failed");
                }
            }
        }

        text
    }
}
