//! Object key derivation for processed documents.

/// Prefix under which redacted copies of PDFs are stored.
pub const REDACTED_PREFIX: &str = "redacted/";

/// What the document pipeline does with an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Other,
}

impl DocumentKind {
    /// Classifies an extension as returned by [`file_extension`].
    ///
    /// Matching is exact: `.PDF` and `.PNG` are not documents.
    pub fn classify(extension: &str) -> Self {
        match extension {
            ".pdf" => DocumentKind::Pdf,
            ".jpeg" | ".jpg" | ".gif" | ".tiff" | ".png" => DocumentKind::Image,
            _ => DocumentKind::Other,
        }
    }
}

/// Returns `"."` followed by the text after the last `.` of the key.
///
/// A key without any dot yields `"."` followed by the whole key.
pub fn file_extension(key: &str) -> String {
    let last = key.rsplit('.').next().unwrap_or(key);
    format!(".{}", last)
}

/// Returns the text before the first `.` of the key.
pub fn file_stem(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

/// Key of the redacted copy of a PDF.
pub fn redacted_key(key: &str) -> String {
    format!("{}{}", REDACTED_PREFIX, key)
}

/// Key of the PDF produced from an image.
///
/// The PDF lands at the bucket root, named after the file part of the stem.
pub fn converted_pdf_key(key: &str) -> String {
    let stem = file_stem(key);
    let name = stem.rsplit('/').next().unwrap_or(stem);
    format!("{}.pdf", name)
}
