//! Content model for Word documents, legacy and modern.

use super::{
    Comment, Content, FileMetadata, Formula, HeaderFooter, Hyperlink, ImageRecord, Note, Section, Table, Unit,
    UnitKind,
};

/// Metadata of a legacy DOC file, read from the compound-file summary
/// stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub last_saved_by: String,
    pub create_time: String,
    pub last_saved_time: String,
    pub num_pages: u32,
    pub num_words: u32,
    pub num_chars: u32,
}

/// Extracted content of a legacy DOC file. The format has no per-page
/// representation, so the whole body is a single block unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocContent {
    pub metadata: DocMetadata,
    pub main_text: String,
    pub footnotes: String,
    pub headers_footers: String,
    pub annotations: String,
}

impl Content for DocContent {
    fn units(&self) -> Vec<Unit> {
        vec![Unit {
            number: 1,
            kind: UnitKind::Block,
            text: self.main_text.clone(),
        }]
    }

    fn images(&self) -> &[ImageRecord] {
        &[]
    }

    fn full_text(&self) -> String {
        format!("{}\n{}", self.metadata.title, self.main_text)
            .trim()
            .to_string()
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "DocContent"
    }
}

/// Metadata of a DOCX file, from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub category: String,
    pub comments: String,
    pub created: String,
    pub modified: String,
    pub last_modified_by: String,
    pub revision: Option<i64>,
}

/// A formatted run inside a paragraph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxRun {
    pub text: String,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxParagraph {
    pub text: String,
    pub style: Option<String>,
    pub alignment: Option<String>,
    pub runs: Vec<DocxRun>,
}

/// Extracted content of a DOCX file.
///
/// `full_text` carries formulas rendered as `$…$`/`$$…$$`;
/// `base_full_text` is the same document order without formulas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxContent {
    pub metadata: DocxMetadata,
    pub paragraphs: Vec<DocxParagraph>,
    pub tables: Vec<Table>,
    pub headers: Vec<HeaderFooter>,
    pub footers: Vec<HeaderFooter>,
    pub images: Vec<ImageRecord>,
    pub hyperlinks: Vec<Hyperlink>,
    pub footnotes: Vec<Note>,
    pub endnotes: Vec<Note>,
    pub comments: Vec<Comment>,
    pub sections: Vec<Section>,
    pub styles: Vec<String>,
    pub formulas: Vec<Formula>,
    pub full_text: String,
    pub base_full_text: String,
}

impl Content for DocxContent {
    // The uniform accessors default to the formula-free projection;
    // `full_text` (with `$…$` runs) stays available as a field.
    fn units(&self) -> Vec<Unit> {
        vec![Unit {
            number: 1,
            kind: UnitKind::Block,
            text: self.base_full_text.clone(),
        }]
    }

    fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    fn full_text(&self) -> String {
        self.base_full_text.clone()
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "DocxContent"
    }
}
