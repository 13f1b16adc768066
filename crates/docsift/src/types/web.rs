//! Content model for HTML, MHTML, and EPUB.

use super::{Content, FileMetadata, ImageRecord, Table, Unit, UnitKind};

/// Metadata from the HTML head.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub language: String,
    pub charset: String,
    pub description: String,
    pub keywords: String,
    pub author: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlHeading {
    pub level: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlLink {
    pub text: String,
    pub href: String,
}

/// Extracted content of an HTML or MHTML document. A single block unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlContent {
    pub metadata: HtmlMetadata,
    pub text: String,
    pub headings: Vec<HtmlHeading>,
    pub links: Vec<HtmlLink>,
    pub tables: Vec<Table>,
}

impl Content for HtmlContent {
    fn units(&self) -> Vec<Unit> {
        vec![Unit {
            number: 1,
            kind: UnitKind::Block,
            text: self.text.clone(),
        }]
    }

    fn images(&self) -> &[ImageRecord] {
        &[]
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "HtmlContent"
    }
}

/// Dublin-Core metadata from the EPUB OPF package document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpubMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub creator: String,
    pub subject: String,
    pub description: String,
    pub publisher: String,
    pub date: String,
    pub language: String,
    pub identifier: String,
    pub rights: String,
}

/// One spine entry, in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpubChapter {
    pub number: u32,
    pub title: String,
    pub text: String,
}

/// Extracted content of an EPUB package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpubContent {
    pub metadata: EpubMetadata,
    pub chapters: Vec<EpubChapter>,
    pub images: Vec<ImageRecord>,
}

impl Content for EpubContent {
    fn units(&self) -> Vec<Unit> {
        self.chapters
            .iter()
            .map(|c| Unit {
                number: c.number,
                kind: UnitKind::Chapter,
                text: c.text.clone(),
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
        "EpubContent"
    }
}
