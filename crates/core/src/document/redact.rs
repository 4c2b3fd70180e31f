//! Masks four-digit groups, such as card number parts, in PDF page text.
//!
//! Page content is decoded, the strings shown by text operators are masked
//! and pages that changed get a single deflated content stream. The document
//! is written back out with a fresh cross-reference table.

use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use regex::bytes::Regex;

use crate::error::{Result, ServiceError};

use super::pdf::pdf_error;
use super::raster::deflate;

/// Byte written over each redacted digit.
pub const REDACTION_MARKER: u8 = b'X';

/// Operators whose string operands are drawn as text.
const TEXT_OPERATORS: [&str; 4] = ["Tj", "TJ", "'", "\""];

/// A redacted document and the number of digit groups masked in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub document: Vec<u8>,
    pub redacted: usize,
}

/// Decoded content of a page, concatenated across its content streams.
///
/// A content stream with a filter that cannot be decoded is an error, so no
/// page is ever passed over unread.
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc
            .get_object(stream_id)
            .and_then(Object::as_stream)
            .map_err(|e| pdf_error("unreadable content stream", e))?;

        if stream.dict.has(b"Filter") {
            let decoded = stream.decompressed_content().map_err(|e| {
                ServiceError::Unsupported(format!(
                    "content stream {} {} cannot be decoded: {}",
                    stream_id.0, stream_id.1, e
                ))
            })?;
            content.extend_from_slice(&decoded);
        } else {
            content.extend_from_slice(&stream.content);
        }
        content.push(b'\n');
    }
    Ok(content)
}

/// Masks digit groups in a text operand. Returns how many were masked.
fn mask_text(operand: &mut Object, digits: &Regex) -> usize {
    match operand {
        Object::String(bytes, _) => {
            let groups: Vec<_> = digits.find_iter(bytes).map(|group| group.range()).collect();
            for range in &groups {
                bytes[range.clone()].fill(REDACTION_MARKER);
            }
            groups.len()
        }
        Object::Array(items) => items.iter_mut().map(|item| mask_text(item, digits)).sum(),
        _ => 0,
    }
}

/// Points the page at one new deflated content stream.
fn replace_page_content(doc: &mut Document, page_id: ObjectId, content: &[u8]) -> Result<()> {
    let deflated = deflate(content)
        .map_err(|e| ServiceError::InvalidData(format!("unable to compress content: {}", e)))?;
    let stream_id = doc.add_object(Stream::new(
        dictionary! { "Filter" => "FlateDecode" },
        deflated,
    ));

    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| pdf_error("unreadable page", e))?
        .set("Contents", stream_id);
    Ok(())
}

/// Redacts every run of four digits in the text shown on each page.
pub fn redact_pdf(document: &[u8]) -> Result<Redaction> {
    if !document.starts_with(b"%PDF-") {
        return Err(ServiceError::InvalidData(
            "document is not a PDF".to_string(),
        ));
    }

    let digits = Regex::new(r"[0-9]{4}")
        .map_err(|e| ServiceError::InvalidData(format!("redaction pattern: {}", e)))?;
    let mut doc =
        Document::load_mem(document).map_err(|e| pdf_error("unable to parse document", e))?;

    let mut redacted = 0;
    for (page_number, page_id) in doc.get_pages() {
        let raw = page_content(&doc, page_id)?;
        let mut content =
            Content::decode(&raw).map_err(|e| pdf_error("unable to parse page content", e))?;

        let masked: usize = content
            .operations
            .iter_mut()
            .filter(|operation| TEXT_OPERATORS.contains(&operation.operator.as_str()))
            .flat_map(|operation| operation.operands.iter_mut())
            .map(|operand| mask_text(operand, &digits))
            .sum();
        if masked == 0 {
            continue;
        }

        tracing::debug!(page = page_number, groups = masked, "masking page text");
        let encoded = content
            .encode()
            .map_err(|e| pdf_error("unable to encode page content", e))?;
        replace_page_content(&mut doc, page_id, &encoded)?;
        redacted += masked;
    }

    if redacted > 0 {
        let pruned = doc.prune_objects();
        tracing::debug!(objects = pruned.len(), "dropped replaced content streams");
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| pdf_error("unable to write document", e))?;

    Ok(Redaction {
        document: output,
        redacted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    /// A one-page document whose content stream has `dictionary` and `data`.
    fn document_with_stream(dictionary: lopdf::Dictionary, data: Vec<u8>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(dictionary, data));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn plain(content: &str) -> Vec<u8> {
        document_with_stream(dictionary! {}, content.as_bytes().to_vec())
    }

    fn compressed(content: &str) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        document_with_stream(
            dictionary! { "Filter" => "FlateDecode" },
            encoder.finish().unwrap(),
        )
    }

    /// Decoded text of the first page.
    fn first_page_text(pdf: &[u8]) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        String::from_utf8(page_content(&doc, page_id).unwrap()).unwrap()
    }

    #[test]
    fn test_redacts_card_number_groups() {
        let pdf = plain("BT /F1 12 Tf 72 700 Td (Card 4111 1111 1111 1234) Tj ET");
        let result = redact_pdf(&pdf).unwrap();
        assert_eq!(result.redacted, 4);

        let text = first_page_text(&result.document);
        assert!(text.contains("Card XXXX XXXX XXXX XXXX"));
        assert!(!text.contains("4111"));
    }

    #[test]
    fn test_compressed_stream_is_masked() {
        let pdf = compressed("BT (Card 4111 1111 1111 1234) Tj ET");
        let result = redact_pdf(&pdf).unwrap();
        assert_eq!(result.redacted, 4);

        let text = first_page_text(&result.document);
        assert!(text.contains("Card XXXX XXXX XXXX XXXX"));
        assert!(!text.contains("1234"));

        // rewritten content is deflated again
        let doc = Document::load_mem(&result.document).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let contents = doc.get_page_contents(page_id);
        assert_eq!(contents.len(), 1);
        let stream = doc.get_object(contents[0]).unwrap().as_stream().unwrap();
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode"
        );
    }

    #[test]
    fn test_undecodable_content_is_an_error() {
        let pdf = document_with_stream(
            dictionary! { "Filter" => "DCTDecode" },
            b"BT (4111 1111) Tj ET".to_vec(),
        );
        assert!(matches!(
            redact_pdf(&pdf),
            Err(ServiceError::Unsupported(_))
        ));
    }

    #[test]
    fn test_only_shown_text_is_touched() {
        let pdf = plain("BT 1234 5678 Td (Ref 123) Tj ET");
        let result = redact_pdf(&pdf).unwrap();
        assert_eq!(result.redacted, 0);
        assert!(first_page_text(&result.document).contains("Ref 123"));
    }

    #[test]
    fn test_longer_runs_mask_each_group() {
        let pdf = plain("BT [(123456789) -120 (Acct 2024)] TJ ET");
        let result = redact_pdf(&pdf).unwrap();
        assert_eq!(result.redacted, 3);

        let text = first_page_text(&result.document);
        assert!(text.contains("XXXXXXXX9"));
        assert!(text.contains("Acct XXXX"));
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(matches!(
            redact_pdf(b"hello"),
            Err(ServiceError::InvalidData(_))
        ));
    }
}
