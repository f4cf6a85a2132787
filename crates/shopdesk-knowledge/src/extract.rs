//! Text extraction and normalization.
//!
//! Extractors are chosen by file extension. PDF, plain text and markdown are
//! built in; other formats plug in through [`ExtractorRegistry::register`].

use std::collections::HashMap;
use std::sync::Arc;

use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::types::ExtractedText;

pub const EXTRACTION_FAILED: &str =
    "Failed to extract text from file. The file may be corrupted or password-protected.";

/// Turns raw file bytes into text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText>;
}

/// UTF-8 text. Pages are separated by form feeds.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ShopDeskError::Extraction(format!("{EXTRACTION_FAILED} ({e})")))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Ok(ExtractedText {
            num_pages: text.matches('\x0c').count() + 1,
            text: text.to_string(),
        })
    }
}

/// PDF text via `lopdf`, one page at a time.
///
/// Encrypted files are refused rather than decrypted.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| ShopDeskError::Extraction(format!("{EXTRACTION_FAILED} ({e})")))?;
        if doc.is_encrypted() {
            return Err(ShopDeskError::Extraction(format!(
                "{EXTRACTION_FAILED} (encrypted PDF)"
            )));
        }

        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut text = String::new();
        for page in &pages {
            match doc.extract_text(&[*page]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                // image-only pages or unsupported fonts
                Err(e) => tracing::debug!("No text on page {page}: {e}"),
            }
        }
        Ok(ExtractedText {
            text,
            num_pages: pages.len(),
        })
    }
}

/// Extension → extractor map.
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self {
            extractors: HashMap::new(),
        };
        let plain: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);
        for ext in ["txt", "md", "markdown"] {
            registry.extractors.insert(ext.into(), plain.clone());
        }
        registry.extractors.insert("pdf".into(), Arc::new(PdfExtractor));
        registry
    }
}

impl ExtractorRegistry {
    /// Register (or replace) the extractor for an extension, e.g. `"pdf"`.
    pub fn register(&mut self, extension: &str, extractor: Arc<dyn TextExtractor>) {
        self.extractors
            .insert(extension.trim_start_matches('.').to_lowercase(), extractor);
    }

    pub fn supported_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.extractors.keys().cloned().collect();
        exts.sort();
        exts
    }

    /// Extractor for `file_name`, or `InvalidInput` when the extension is unsupported.
    pub fn for_file(&self, file_name: &str) -> Result<Arc<dyn TextExtractor>> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        self.extractors.get(&ext).cloned().ok_or_else(|| {
            ShopDeskError::InvalidInput(format!(
                "Unsupported file type '{file_name}'. Allowed: {}",
                self.supported_extensions().join(", ")
            ))
        })
    }
}

/// Strip control characters, collapse whitespace runs to one space, trim.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            continue;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_pages() {
        let doc = PlainTextExtractor.extract(b"page one\x0cpage two").unwrap();
        assert_eq!(doc.num_pages, 2);
        assert!(doc.text.contains("page two"));
    }

    #[test]
    fn test_invalid_utf8_is_extraction_error() {
        let err = PlainTextExtractor.extract(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ShopDeskError::Extraction(_)));
    }

    #[test]
    fn test_registry_by_extension() {
        let reg = ExtractorRegistry::default();
        assert!(reg.for_file("Return-Policy.TXT").is_ok());
        assert!(reg.for_file("faq.md").is_ok());
        assert!(reg.for_file("Return-Policy.PDF").is_ok());
        assert!(matches!(
            reg.for_file("policy.docx"),
            Err(ShopDeskError::InvalidInput(_))
        ));
        assert!(reg.for_file("noext").is_err());
    }

    #[test]
    fn test_registry_accepts_plugins() {
        struct Fixed;
        impl TextExtractor for Fixed {
            fn extract(&self, _: &[u8]) -> Result<ExtractedText> {
                Ok(ExtractedText {
                    text: "from pdf".into(),
                    num_pages: 3,
                })
            }
        }
        let mut reg = ExtractorRegistry::default();
        reg.register(".RTF", Arc::new(Fixed));
        let doc = reg.for_file("policy.rtf").unwrap().extract(b"{\\rtf1").unwrap();
        assert_eq!(doc.num_pages, 3);
        assert!(reg.supported_extensions().contains(&"rtf".to_string()));
    }

    /// Minimal PDF with one line of text per page.
    fn pdf_with_pages(lines: &[&str], encrypt: bool) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

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
        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if encrypt {
            let encrypt_id = doc.add_object(dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
                "O" => Object::string_literal(vec![0x5a_u8; 32]),
                "U" => Object::string_literal(vec![0xa5_u8; 32]),
                "P" => -44,
            });
            doc.trailer.set("Encrypt", encrypt_id);
        }
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_pdf_text_and_page_count() {
        let bytes = pdf_with_pages(&["Returns accepted within 30 days", "Refunds in 5 days"], false);
        let doc = PdfExtractor.extract(&bytes).unwrap();
        assert_eq!(doc.num_pages, 2);
        let text = normalize_text(&doc.text);
        assert!(text.contains("Returns accepted within 30 days"));
        assert!(text.contains("Refunds in 5 days"));
    }

    #[test]
    fn test_corrupt_pdf_is_extraction_error() {
        let err = PdfExtractor.extract(b"%PDF-1.4\ngarbage without xref").unwrap_err();
        assert!(matches!(err, ShopDeskError::Extraction(_)));
    }

    #[test]
    fn test_encrypted_pdf_is_extraction_error() {
        let bytes = pdf_with_pages(&["secret terms"], true);
        let err = PdfExtractor.extract(&bytes).unwrap_err();
        assert!(matches!(err, ShopDeskError::Extraction(_)));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize_text("  Return\u{0}  policy:\n\n\t30\x0cdays  "),
            "Return policy: 30 days"
        );
        assert_eq!(normalize_text("\u{1}\u{2}  "), "");
    }
}
