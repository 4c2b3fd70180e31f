//! Document pipeline triggered by S3 uploads.
//!
//! Images are converted into a one-page PDF that replaces the original
//! object. PDFs get a redacted copy under `redacted/` unless they already
//! carry the redacted refinement tag.

use aws_lambda_events::s3::S3Event;
use cloudkit_core::document::{image_to_pdf, redact_pdf};
use cloudkit_core::s3::{
    converted_pdf_key, file_extension, has_redacted_refinement, redacted_key, DocumentKind,
    ObjectStore, Refinement,
};
use cloudkit_core::{Result, ServiceError};

/// What happened to one uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// The image was replaced by the PDF at `key`.
    Converted { key: String },
    /// A redacted copy was written to `key`.
    Redacted { key: String, redactions: usize },
    AlreadyRedacted,
    /// The image type cannot be embedded into a PDF.
    Unsupported { extension: String },
    /// Neither an image nor a PDF.
    Skipped,
}

/// Decodes an object key as S3 writes it into event notifications.
pub fn decode_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, key = %key, "unable to decode key");
            spaced
        }
    }
}

/// Bucket and decoded key of every record carrying both.
pub fn uploaded_objects(event: &S3Event) -> Vec<(String, String)> {
    event
        .records
        .iter()
        .filter_map(|record| {
            let bucket = record.s3.bucket.name.as_deref()?;
            let key = record.s3.object.key.as_deref()?;
            Some((bucket.to_string(), decode_key(key)))
        })
        .collect()
}

/// Runs the pipeline on one object.
pub async fn process_object<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    key: &str,
) -> Result<ConvertOutcome> {
    let extension = file_extension(key);

    match DocumentKind::classify(&extension) {
        DocumentKind::Image => {
            let image = store.get_object(bucket, key).await?;
            let pdf = match image_to_pdf(&extension, &image) {
                Ok(pdf) => pdf,
                Err(ServiceError::Unsupported(reason)) => {
                    tracing::warn!(bucket = %bucket, key = %key, reason = %reason, "image not converted");
                    return Ok(ConvertOutcome::Unsupported { extension });
                }
                Err(e) => return Err(e),
            };

            let pdf_key = converted_pdf_key(key);
            store
                .put_object(bucket, &pdf_key, pdf, &[Refinement::ImageConversion.tag()])
                .await?;
            store.delete_object(bucket, key).await?;
            tracing::info!(bucket = %bucket, from = %key, to = %pdf_key, "converted image");
            Ok(ConvertOutcome::Converted { key: pdf_key })
        }
        DocumentKind::Pdf => {
            let tags = store.get_object_tags(bucket, key).await?;
            if has_redacted_refinement(&tags) {
                tracing::debug!(bucket = %bucket, key = %key, "already redacted");
                return Ok(ConvertOutcome::AlreadyRedacted);
            }

            let document = store.get_object(bucket, key).await?;
            let redaction = redact_pdf(&document)?;
            let target = redacted_key(key);
            store
                .put_object(
                    bucket,
                    &target,
                    redaction.document,
                    &[Refinement::Redacted.tag()],
                )
                .await?;
            tracing::info!(bucket = %bucket, key = %target, redactions = redaction.redacted, "redacted document");
            Ok(ConvertOutcome::Redacted {
                key: target,
                redactions: redaction.redacted,
            })
        }
        DocumentKind::Other => {
            tracing::debug!(bucket = %bucket, key = %key, "not a document");
            Ok(ConvertOutcome::Skipped)
        }
    }
}

/// Processes every uploaded object of an event.
///
/// `bucket_override` replaces the bucket named by the records, so the
/// function can be pointed at a fixed document bucket.
pub async fn handle_upload<S: ObjectStore + ?Sized>(
    store: &S,
    bucket_override: Option<&str>,
    event: &S3Event,
) -> Result<Vec<ConvertOutcome>> {
    let mut outcomes = Vec::new();
    for (bucket, key) in uploaded_objects(event) {
        let bucket = bucket_override.unwrap_or(&bucket);
        outcomes.push(process_object(store, bucket, &key).await?);
    }
    Ok(outcomes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    use cloudkit_core::s3::{InMemoryObjectStore, ObjectTag};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};
    use serde_json::json;

    /// A sample `ObjectCreated:Put` notification.
    pub(crate) fn s3_event(bucket: &str, key: &str) -> S3Event {
        serde_json::from_value(json!({
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "us-east-1",
                "eventTime": "2023-03-01T10:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": { "principalId": "EXAMPLE" },
                "requestParameters": { "sourceIPAddress": "127.0.0.1" },
                "responseElements": {
                    "x-amz-request-id": "EXAMPLE123456789",
                    "x-amz-id-2": "EXAMPLE123/5678abcdefghijklambdaisawesome/mnopqrstuvwxyzABCDEFGH"
                },
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "testConfigRule",
                    "bucket": {
                        "name": bucket,
                        "ownerIdentity": { "principalId": "EXAMPLE" },
                        "arn": format!("arn:aws:s3:::{}", bucket)
                    },
                    "object": {
                        "key": key,
                        "size": 1024,
                        "eTag": "0123456789abcdef0123456789abcdef",
                        "sequencer": "0A1B2C3D4E5F678901"
                    }
                }
            }]
        }))
        .unwrap()
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([120, 120, 120]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, ImageFormat::Jpeg)
            .unwrap();
        bytes.into_inner()
    }

    fn gif() -> Vec<u8> {
        let image = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut bytes, ImageFormat::Gif)
            .unwrap();
        bytes.into_inner()
    }

    /// A one-page PDF showing `text`, with the content stream under `filter`.
    fn pdf_with_filter(text: &str, filter: Option<&str>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut content = Dictionary::new();
        if let Some(filter) = filter {
            content.set("Filter", Object::Name(filter.as_bytes().to_vec()));
        }
        let content_id = doc.add_object(Stream::new(
            content,
            format!("BT ({}) Tj ET", text).into_bytes(),
        ));
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
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn pdf(text: &str) -> Vec<u8> {
        pdf_with_filter(text, None)
    }

    fn page_text(pdf: &[u8]) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        String::from_utf8(doc.get_page_content(page_id).unwrap()).unwrap()
    }

    #[test]
    fn test_decode_key() {
        assert_eq!(decode_key("my+scan%281%29.png"), "my scan(1).png");
        assert_eq!(decode_key("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn test_uploaded_objects() {
        let event = s3_event("docs", "reports/q1+summary.pdf");
        assert_eq!(
            uploaded_objects(&event),
            vec![("docs".to_string(), "reports/q1 summary.pdf".to_string())]
        );
    }

    #[tokio::test]
    async fn test_image_replaced_by_pdf() {
        let store = InMemoryObjectStore::new();
        store.insert("docs", "scan.jpg", jpeg(40, 20), vec![]).await;

        let outcome = process_object(&store, "docs", "scan.jpg").await.unwrap();

        assert_eq!(
            outcome,
            ConvertOutcome::Converted {
                key: "scan.pdf".to_string()
            }
        );
        assert!(!store.contains("docs", "scan.jpg").await);
        let body = store.get_object("docs", "scan.pdf").await.unwrap();
        assert!(body.starts_with(b"%PDF-"));
        assert_eq!(
            store.get_object_tags("docs", "scan.pdf").await.unwrap(),
            vec![ObjectTag::new("refinement", "imageConversion")]
        );
    }

    #[tokio::test]
    async fn test_pdf_gets_redacted_copy() {
        let store = InMemoryObjectStore::new();
        store
            .insert("docs", "card.pdf", pdf("Card 4111 1111 1111 1234"), vec![])
            .await;

        let outcome = process_object(&store, "docs", "card.pdf").await.unwrap();

        assert_eq!(
            outcome,
            ConvertOutcome::Redacted {
                key: "redacted/card.pdf".to_string(),
                redactions: 4
            }
        );
        assert!(store.contains("docs", "card.pdf").await);
        let body = store.get_object("docs", "redacted/card.pdf").await.unwrap();
        assert!(page_text(&body).contains("(Card XXXX XXXX XXXX XXXX)"));
        assert_eq!(
            store.get_object_tags("docs", "redacted/card.pdf").await.unwrap(),
            vec![ObjectTag::new("refinement", "redacted")]
        );
    }

    #[tokio::test]
    async fn test_redacted_pdf_is_left_alone() {
        let store = InMemoryObjectStore::new();
        store
            .insert(
                "docs",
                "redacted/card.pdf",
                pdf("Card XXXX"),
                vec![ObjectTag::new("refinement", "redacted")],
            )
            .await;

        let outcome = process_object(&store, "docs", "redacted/card.pdf")
            .await
            .unwrap();

        assert_eq!(outcome, ConvertOutcome::AlreadyRedacted);
        assert!(!store.contains("docs", "redacted/redacted/card.pdf").await);
    }

    #[tokio::test]
    async fn test_gif_converted_and_other_files_skipped() {
        let store = InMemoryObjectStore::new();
        store.insert("docs", "anim.gif", gif(), vec![]).await;
        store.insert("docs", "notes.txt", b"hello".to_vec(), vec![]).await;
        store.insert("docs", "REPORT.PDF", pdf("4111"), vec![]).await;

        assert_eq!(
            process_object(&store, "docs", "anim.gif").await.unwrap(),
            ConvertOutcome::Converted {
                key: "anim.pdf".to_string()
            }
        );
        assert!(!store.contains("docs", "anim.gif").await);
        assert_eq!(
            process_object(&store, "docs", "notes.txt").await.unwrap(),
            ConvertOutcome::Skipped
        );
        assert_eq!(
            process_object(&store, "docs", "REPORT.PDF").await.unwrap(),
            ConvertOutcome::Skipped
        );
        assert!(!store.contains("docs", "redacted/REPORT.PDF").await);
    }

    #[tokio::test]
    async fn test_nested_image_lands_at_bucket_root() {
        let store = InMemoryObjectStore::new();
        store.insert("docs", "photos/2023/scan.jpeg", jpeg(8, 8), vec![]).await;

        assert_eq!(
            process_object(&store, "docs", "photos/2023/scan.jpeg")
                .await
                .unwrap(),
            ConvertOutcome::Converted {
                key: "scan.pdf".to_string()
            }
        );
        assert!(store.contains("docs", "scan.pdf").await);
    }

    #[tokio::test]
    async fn test_undecodable_pdf_writes_nothing() {
        let store = InMemoryObjectStore::new();
        store
            .insert("docs", "card.pdf", pdf_with_filter("4111 1111", Some("DCTDecode")), vec![])
            .await;

        let result = process_object(&store, "docs", "card.pdf").await;

        assert!(matches!(result, Err(ServiceError::Unsupported(_))));
        assert!(!store.contains("docs", "redacted/card.pdf").await);
    }

    #[tokio::test]
    async fn test_missing_object_fails() {
        let store = InMemoryObjectStore::new();
        let result = process_object(&store, "docs", "gone.png").await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_handle_upload_uses_bucket_override() {
        let store = InMemoryObjectStore::new();
        store.insert("fixed", "scan.jpg", jpeg(10, 10), vec![]).await;
        let event = s3_event("elsewhere", "scan.jpg");

        let outcomes = handle_upload(&store, Some("fixed"), &event).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(store.contains("fixed", "scan.pdf").await);
    }
}
