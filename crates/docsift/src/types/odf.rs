//! Content model for OpenDocument text, presentation, and spreadsheet.

use super::{
    Bookmark, Comment, Content, FileMetadata, HeaderFooter, Hyperlink, ImageRecord, Note, Sheet, Table, Unit,
    UnitKind,
};

/// Metadata from `office:meta` in `meta.xml`, shared by ODT/ODP/ODS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OdfMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub creator: String,
    pub subject: String,
    pub description: String,
    pub date: String,
    pub language: String,
    pub keywords: String,
    pub initial_creator: String,
    pub creation_date: String,
    pub editing_cycles: String,
    pub editing_duration: String,
    pub generator: String,
}

/// A paragraph or heading from an ODT body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OdtParagraph {
    pub text: String,
    pub style: String,
    /// Outline level for headings, 0 for plain paragraphs.
    pub outline_level: u32,
}

/// Extracted content of an ODT file. The body is a single block unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OdtContent {
    pub metadata: OdfMetadata,
    pub paragraphs: Vec<OdtParagraph>,
    pub tables: Vec<Table>,
    pub hyperlinks: Vec<Hyperlink>,
    pub footnotes: Vec<Note>,
    pub endnotes: Vec<Note>,
    pub comments: Vec<Comment>,
    pub bookmarks: Vec<Bookmark>,
    pub headers: Vec<HeaderFooter>,
    pub footers: Vec<HeaderFooter>,
    pub styles: Vec<String>,
    pub images: Vec<ImageRecord>,
    pub text: String,
}

impl Content for OdtContent {
    fn units(&self) -> Vec<Unit> {
        vec![Unit {
            number: 1,
            kind: UnitKind::Block,
            text: self.text.clone(),
        }]
    }

    fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "OdtContent"
    }
}

/// One page of an ODP presentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OdpSlide {
    pub slide_number: u32,
    pub name: String,
    pub title: String,
    pub content: Vec<String>,
    pub notes: Vec<String>,
    pub tables: Vec<Table>,
    pub text: String,
}

/// Extracted content of an ODP file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OdpContent {
    pub metadata: OdfMetadata,
    pub slides: Vec<OdpSlide>,
    pub images: Vec<ImageRecord>,
}

impl Content for OdpContent {
    fn units(&self) -> Vec<Unit> {
        self.slides
            .iter()
            .map(|s| Unit {
                number: s.slide_number,
                kind: UnitKind::Slide,
                text: s.text.clone(),
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
        "OdpContent"
    }
}

/// Extracted content of an ODS file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OdsContent {
    pub metadata: OdfMetadata,
    pub sheets: Vec<Sheet>,
    pub images: Vec<ImageRecord>,
}

impl Content for OdsContent {
    fn units(&self) -> Vec<Unit> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(i, sheet)| Unit {
                number: (i + 1) as u32,
                kind: UnitKind::Sheet,
                text: format!("{}\n{}", sheet.name, sheet.text.trim()),
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
        "OdsContent"
    }
}
