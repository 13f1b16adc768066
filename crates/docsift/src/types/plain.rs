//! Content model for plain-text inputs.

use super::{Content, FileMetadata, ImageRecord, Unit, UnitKind};

/// Extracted content of a plain-text file (txt/csv/tsv/md/json). The
/// detected encoding label is recorded in the file metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlainTextContent {
    pub content: String,
    pub metadata: FileMetadata,
}

impl Content for PlainTextContent {
    fn units(&self) -> Vec<Unit> {
        vec![Unit {
            number: 1,
            kind: UnitKind::Block,
            text: self.content.clone(),
        }]
    }

    fn images(&self) -> &[ImageRecord] {
        &[]
    }

    fn full_text(&self) -> String {
        self.content.clone()
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    fn type_tag(&self) -> &'static str {
        "PlainTextContent"
    }
}
