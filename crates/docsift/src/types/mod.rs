//! The shared content model.
//!
//! Every decoder projects its format onto the types in this module tree:
//! one content struct per format family, each carrying a format-specific
//! metadata struct that embeds [`FileMetadata`], plus plain owned records
//! for structure (tables, runs, notes, formulas, images).
//!
//! Absence is always an empty/zero sentinel, never a null-carrying field;
//! the only `Option`s are genuinely tri-state values (pixel dimensions,
//! image payloads, unit association).

mod mail;
mod odf;
mod pdf;
mod plain;
mod rtf;
mod sheet;
mod slides;
mod web;
mod word;

pub use mail::{EmailAddress, EmailContent, EmailMetadata};
pub use odf::{OdfMetadata, OdpContent, OdpSlide, OdsContent, OdtContent, OdtParagraph};
pub use pdf::{PdfContent, PdfMetadata, PdfPage};
pub use plain::PlainTextContent;
pub use rtf::{
    RtfColor, RtfContent, RtfField, RtfFont, RtfHeaderFooter, RtfMetadata, RtfPage, RtfParagraph, RtfStyle,
};
pub use sheet::{CellValue, Sheet, XlsContent, XlsMetadata, XlsxContent, XlsxMetadata};
pub use slides::{PptContent, PptMetadata, PptSlide, PptTextBlock, PptxContent, PptxMetadata, PptxSlide};
pub use web::{
    EpubChapter, EpubContent, EpubMetadata, HtmlContent, HtmlHeading, HtmlLink, HtmlMetadata,
};
pub use word::{
    DocContent, DocMetadata, DocxContent, DocxMetadata, DocxParagraph, DocxRun,
};

use std::path::Path;

/// File-level metadata shared by every format.
///
/// Populated from the caller-supplied path before the content object is
/// emitted and immutable thereafter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata {
    pub filename: String,
    pub file_extension: String,
    pub file_path: String,
    pub folder_path: String,
    /// Label reported by the encoding sniffer, for formats that decode
    /// raw bytes (plain text, HTML).
    pub detected_encoding: Option<String>,
}

impl FileMetadata {
    /// Build file metadata from a path. The file does not need to exist;
    /// the path string alone is projected into the fields.
    pub fn from_path(path: &str) -> Self {
        let mut meta = FileMetadata::default();
        meta.populate_from_path(path);
        meta
    }

    pub fn populate_from_path(&mut self, path: &str) {
        let p = Path::new(path);
        self.filename = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.file_extension = p
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        self.file_path = p
            .canonicalize()
            .map(|c| c.to_string_lossy().into_owned())
            .unwrap_or_else(|_| path.to_string());
        self.folder_path = p
            .parent()
            .map(|parent| {
                parent
                    .canonicalize()
                    .map(|c| c.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| parent.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
    }
}

/// What kind of logical unit a content object yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Page,
    Slide,
    Sheet,
    Chapter,
    Block,
    MailBody,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Page => "page",
            UnitKind::Slide => "slide",
            UnitKind::Sheet => "sheet",
            UnitKind::Chapter => "chapter",
            UnitKind::Block => "block",
            UnitKind::MailBody => "mail_body",
        }
    }
}

/// One logical unit of a content object: a page, slide, sheet, chapter,
/// mail body, or single paragraph-block, in natural 1-based order.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub number: u32,
    pub kind: UnitKind,
    pub text: String,
}

/// An embedded raster image, uniform across all formats.
///
/// `image_index` is 1-based and strictly increasing within one content
/// object; `unit_index` names the owning unit, `None` for document-global
/// images. The payload is owned by the record; a best-effort failure
/// leaves `data` empty and `error` populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRecord {
    pub image_index: u32,
    pub unit_index: Option<u32>,
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub caption: String,
    pub description: String,
    pub data: Option<Vec<u8>>,
    pub error: Option<String>,
    /// PDF XObject extras; empty for other formats.
    pub color_space: Option<String>,
    pub bits_per_component: Option<u8>,
    pub filter: Option<String>,
}

/// A table flattened to rows of cell strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// A header or footer block with its variant tag ("default", "first",
/// "even", …).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFooter {
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hyperlink {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bookmark {
    pub name: String,
    pub text: String,
}

/// A footnote or endnote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Note {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub date: String,
    pub text: String,
}

/// A converted equation. `is_display` distinguishes `$$…$$` blocks from
/// inline `$…$` runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Formula {
    pub latex: String,
    pub is_display: bool,
}

/// Page geometry of a document section, in inches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub page_width_inches: Option<f64>,
    pub page_height_inches: Option<f64>,
    pub left_margin_inches: Option<f64>,
    pub right_margin_inches: Option<f64>,
    pub top_margin_inches: Option<f64>,
    pub bottom_margin_inches: Option<f64>,
    /// Only set when non-portrait.
    pub orientation: Option<String>,
}

/// The tagged sum over every content object the library can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedContent {
    Doc(DocContent),
    Docx(DocxContent),
    Xls(XlsContent),
    Xlsx(XlsxContent),
    Ppt(PptContent),
    Pptx(PptxContent),
    Rtf(RtfContent),
    Odt(OdtContent),
    Odp(OdpContent),
    Ods(OdsContent),
    Pdf(PdfContent),
    PlainText(PlainTextContent),
    Html(HtmlContent),
    Epub(EpubContent),
    Email(EmailContent),
}

macro_rules! for_each_variant {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            ExtractedContent::Doc($inner) => $body,
            ExtractedContent::Docx($inner) => $body,
            ExtractedContent::Xls($inner) => $body,
            ExtractedContent::Xlsx($inner) => $body,
            ExtractedContent::Ppt($inner) => $body,
            ExtractedContent::Pptx($inner) => $body,
            ExtractedContent::Rtf($inner) => $body,
            ExtractedContent::Odt($inner) => $body,
            ExtractedContent::Odp($inner) => $body,
            ExtractedContent::Ods($inner) => $body,
            ExtractedContent::Pdf($inner) => $body,
            ExtractedContent::PlainText($inner) => $body,
            ExtractedContent::Html($inner) => $body,
            ExtractedContent::Epub($inner) => $body,
            ExtractedContent::Email($inner) => $body,
        }
    };
}

/// The shared extraction interface every content struct implements.
pub trait Content {
    /// Logical units in natural 1-based order.
    fn units(&self) -> Vec<Unit>;

    /// Embedded images, in strictly increasing `image_index` order.
    fn images(&self) -> &[ImageRecord];

    /// Newline-joined concatenation of per-unit text in unit order.
    fn full_text(&self) -> String {
        self.units()
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The file-level metadata embedded in the format metadata.
    fn file_metadata(&self) -> &FileMetadata;

    /// Type tag used by the serializer.
    fn type_tag(&self) -> &'static str;
}

impl Content for ExtractedContent {
    fn units(&self) -> Vec<Unit> {
        for_each_variant!(self, c => c.units())
    }

    fn images(&self) -> &[ImageRecord] {
        for_each_variant!(self, c => c.images())
    }

    fn full_text(&self) -> String {
        for_each_variant!(self, c => c.full_text())
    }

    fn file_metadata(&self) -> &FileMetadata {
        for_each_variant!(self, c => c.file_metadata())
    }

    fn type_tag(&self) -> &'static str {
        for_each_variant!(self, c => c.type_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_metadata_from_path() {
        let meta = FileMetadata::from_path("/no/such/dir/report.DOCX");
        assert_eq!(meta.filename, "report.DOCX");
        assert_eq!(meta.file_extension, ".DOCX");
        assert_eq!(meta.file_path, "/no/such/dir/report.DOCX");
        assert!(meta.detected_encoding.is_none());
    }

    #[test]
    fn test_unit_kind_labels() {
        assert_eq!(UnitKind::Page.as_str(), "page");
        assert_eq!(UnitKind::MailBody.as_str(), "mail_body");
    }

    #[test]
    fn test_default_full_text_joins_units() {
        let content = PlainTextContent {
            content: "hello".to_string(),
            ..Default::default()
        };
        assert_eq!(content.full_text(), "hello");
    }
}
