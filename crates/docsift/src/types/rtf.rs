//! Content model for RTF documents.

use super::{Bookmark, Comment, Content, FileMetadata, HeaderFooter, Hyperlink, ImageRecord, Note, Unit, UnitKind};

/// A font definition from the RTF font table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfFont {
    pub font_id: i64,
    /// roman, swiss, modern, script, decor, tech.
    pub font_family: String,
    pub font_name: String,
    pub charset: i64,
    pub pitch: i64,
}

/// A color from the RTF color table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfColor {
    pub index: i64,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RtfColor {
    pub fn hex_color(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// A paragraph or character style from the stylesheet group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfStyle {
    pub style_id: i64,
    /// paragraph, character, table.
    pub style_type: String,
    pub style_name: String,
    pub based_on: Option<i64>,
    pub next_style: Option<i64>,
}

/// Metadata from the RTF `\info` group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub subject: String,
    pub author: String,
    pub keywords: String,
    pub comments: String,
    pub operator: String,
    pub category: String,
    pub manager: String,
    pub company: String,
    pub doc_comment: String,
    pub version: i64,
    pub revision: i64,
    pub created: String,
    pub modified: String,
    pub num_pages: i64,
    pub num_words: i64,
    pub num_chars: i64,
    pub num_chars_with_spaces: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfParagraph {
    pub text: String,
}

pub use super::HeaderFooter as RtfHeaderFooter;

/// A field instruction (PAGE, DATE, TIME, STYLEREF, TOC, …).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfField {
    pub field_type: String,
    pub field_instruction: String,
    pub field_result: String,
}

/// One page of body text, split at `\page` control words.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfPage {
    pub number: u32,
    pub text: String,
}

/// Extracted content of an RTF file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtfContent {
    pub metadata: RtfMetadata,
    pub fonts: Vec<RtfFont>,
    pub colors: Vec<RtfColor>,
    pub styles: Vec<RtfStyle>,
    pub paragraphs: Vec<RtfParagraph>,
    pub headers: Vec<HeaderFooter>,
    pub footers: Vec<HeaderFooter>,
    pub hyperlinks: Vec<Hyperlink>,
    pub bookmarks: Vec<Bookmark>,
    pub fields: Vec<RtfField>,
    pub images: Vec<ImageRecord>,
    pub footnotes: Vec<Note>,
    pub annotations: Vec<Comment>,
    pub pages: Vec<RtfPage>,
    pub full_text: String,
}

impl Content for RtfContent {
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

    fn full_text(&self) -> String {
        self.full_text.clone()
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "RtfContent"
    }
}
