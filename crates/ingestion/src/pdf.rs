//! PDF handling
//!
//! Signature check, best-effort text extraction with lopdf, and base64
//! encoding for document-understanding requests.

use crate::errors::IngestionError;
use base64::Engine;
use tracing::{debug, warn};

/// Magic bytes every PDF starts with
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Readers accept the header anywhere in the first kilobyte
const SIGNATURE_WINDOW: usize = 1024;

/// True when the header appears within the first kilobyte
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    window
        .windows(PDF_SIGNATURE.len())
        .any(|candidate| candidate == PDF_SIGNATURE)
}

/// Extract plain text from every page of an in-memory PDF.
///
/// Pages that fail to decode are skipped with a warning.
pub fn extract_text(bytes: &[u8]) -> Result<String, IngestionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestionError::PdfParse {
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for page in &pages {
        match doc.extract_text(&[*page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    let cleaned = clean_text(&text);

    debug!(
        original_len = text.len(),
        cleaned_len = cleaned.len(),
        "Text extraction complete"
    );

    Ok(cleaned)
}

/// Standard (padded) base64 of the document
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Collapse whitespace and normalize typographic quotes
fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// One-page PDF showing `text` in Courier
    fn build_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_signature_check() {
        assert!(has_pdf_signature(b"%PDF-1.7\n..."));
        assert!(has_pdf_signature(b"\xEF\xBB\xBF%PDF-1.4"));
        assert!(!has_pdf_signature(b"PK\x03\x04 zip archive"));
        assert!(!has_pdf_signature(b""));

        let mut late = vec![b' '; SIGNATURE_WINDOW];
        late.extend_from_slice(PDF_SIGNATURE);
        assert!(!has_pdf_signature(&late));
    }

    #[test]
    fn test_extracts_page_text() {
        let bytes = build_pdf("Residual learning");
        assert!(has_pdf_signature(&bytes));

        let text = extract_text(&bytes).unwrap();
        assert!(text.contains("Residual learning"), "got {:?}", text);
    }

    #[test]
    fn test_truncated_pdf_is_a_parse_error() {
        let err = extract_text(b"%PDF-1.4\n1 0 obj\n<<").unwrap_err();
        assert!(matches!(err, IngestionError::PdfParse { .. }));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("Hello   World\n\nTest"), "Hello World Test");
        assert_eq!(clean_text("\u{201C}quoted\u{201D} it\u{2019}s"), "\"quoted\" it's");
    }

    #[test]
    fn test_base64_is_standard_padded() {
        assert_eq!(encode_base64(b"%PDF-"), "JVBERi0=");
    }
}
