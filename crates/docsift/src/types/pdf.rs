//! Content model for PDF documents.

use super::{Content, FileMetadata, ImageRecord, Unit, UnitKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfMetadata {
    pub file: FileMetadata,
    pub total_pages: u32,
}

/// One page: its extracted text. Page images live on the content object
/// with `unit_index` pointing back here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfPage {
    pub number: u32,
    pub text: String,
}

/// Extracted content of a PDF file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfContent {
    pub metadata: PdfMetadata,
    pub pages: Vec<PdfPage>,
    pub images: Vec<ImageRecord>,
}

impl Content for PdfContent {
    fn units(&self) -> Vec<Unit> {
        self.pages
            .iter()
            .map(|p| Unit {
                number: p.number,
                kind: UnitKind::Page,
                text: p.text.clone(),
            })
            .collect()
    }

    fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "PdfContent"
    }
}
