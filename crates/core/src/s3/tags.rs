//! Object tags recording which processing was applied.

use std::fmt;

/// Tag key used for every refinement tag.
pub const REFINEMENT_TAG_KEY: &str = "refinement";

/// A single S3 object tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTag {
    pub key: String,
    pub value: String,
}

impl ObjectTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Processing applied to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    Redacted,
    ImageConversion,
}

impl Refinement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Refinement::Redacted => "redacted",
            Refinement::ImageConversion => "imageConversion",
        }
    }

    /// The tag written next to a processed object.
    pub fn tag(&self) -> ObjectTag {
        ObjectTag::new(REFINEMENT_TAG_KEY, self.as_str())
    }
}

impl fmt::Display for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when any tag value marks the object as already redacted.
///
/// Only the value is compared, whatever the key.
pub fn has_redacted_refinement(tags: &[ObjectTag]) -> bool {
    tags.iter()
        .any(|tag| tag.value == Refinement::Redacted.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refinement_tags() {
        assert_eq!(
            Refinement::Redacted.tag(),
            ObjectTag::new("refinement", "redacted")
        );
        assert_eq!(
            Refinement::ImageConversion.tag(),
            ObjectTag::new("refinement", "imageConversion")
        );
    }

    #[test]
    fn test_has_redacted_refinement_matches_value_only() {
        let tags = vec![
            ObjectTag::new("owner", "finance"),
            ObjectTag::new("status", "redacted"),
        ];
        assert!(has_redacted_refinement(&tags));
    }

    #[test]
    fn test_has_redacted_refinement_absent() {
        let tags = vec![ObjectTag::new("redacted", "no")];
        assert!(!has_redacted_refinement(&tags));
        assert!(!has_redacted_refinement(&[]));
    }
}
