//! Content model for presentations, legacy and modern.

use super::{Comment, Content, FileMetadata, Formula, ImageRecord, Unit, UnitKind};

/// Metadata of a legacy PPT file, from the summary and document-summary
/// streams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub subject: String,
    pub author: String,
    pub keywords: String,
    pub comments: String,
    pub last_saved_by: String,
    pub created: String,
    pub modified: String,
    pub revision_number: String,
    pub category: String,
    pub company: String,
    pub manager: String,
    pub creating_application: String,
    pub num_slides: u32,
    pub num_notes: u32,
    pub num_hidden_slides: u32,
}

/// A block of text from the PowerPoint Document stream with the
/// text-type it was declared with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptTextBlock {
    pub text: String,
    /// Raw text-type from the TextHeaderAtom, when one preceded the atom.
    pub text_type: Option<u16>,
}

/// One slide of a legacy PPT deck.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptSlide {
    pub slide_number: u32,
    pub title: String,
    pub body_text: Vec<String>,
    pub other_text: Vec<String>,
    pub notes: Vec<String>,
    pub all_text: Vec<PptTextBlock>,
}

impl PptSlide {
    /// Title, body, and other text of this slide combined.
    pub fn text_combined(&self) -> String {
        let mut parts = Vec::new();
        if !self.title.is_empty() {
            parts.push(self.title.clone());
        }
        parts.extend(self.body_text.iter().cloned());
        parts.extend(self.other_text.iter().cloned());
        parts.join("\n")
    }
}

/// Extracted content of a legacy PPT file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptContent {
    pub metadata: PptMetadata,
    pub slides: Vec<PptSlide>,
    pub master_text: Vec<String>,
    pub all_text: Vec<String>,
}

impl Content for PptContent {
    fn units(&self) -> Vec<Unit> {
        self.slides
            .iter()
            .map(|s| Unit {
                number: s.slide_number,
                kind: UnitKind::Slide,
                text: s.text_combined(),
            })
            .collect()
    }

    fn images(&self) -> &[ImageRecord] {
        &[]
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "PptContent"
    }
}

/// Metadata of a PPTX file, from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptxMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub subject: String,
    pub author: String,
    pub last_modified_by: String,
    pub created: String,
    pub modified: String,
    pub keywords: String,
    pub comments: String,
    pub category: String,
    pub revision: Option<i64>,
}

/// One slide of a PPTX deck.
///
/// `text` is the ordered slide text including formulas, comments, and
/// image captions; `base_text` is restricted to visible shape text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptxSlide {
    pub slide_number: u32,
    pub title: String,
    pub footer: String,
    pub content_placeholders: Vec<String>,
    pub other_textboxes: Vec<String>,
    pub formulas: Vec<Formula>,
    pub comments: Vec<Comment>,
    pub text: String,
    pub base_text: String,
}

/// Extracted content of a PPTX file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptxContent {
    pub metadata: PptxMetadata,
    pub slides: Vec<PptxSlide>,
    pub images: Vec<ImageRecord>,
}

impl Content for PptxContent {
    // Units carry the base text; formulas, comments, and image captions
    // stay in the per-slide `text` field.
    fn units(&self) -> Vec<Unit> {
        self.slides
            .iter()
            .map(|s| Unit {
                number: s.slide_number,
                kind: UnitKind::Slide,
                text: s.base_text.trim().to_string(),
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
        "PptxContent"
    }
}
