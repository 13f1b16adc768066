//! OpenDocument decoders (ODT, ODP, ODS).
//!
//! All three share the ODF conventions: a ZIP with `content.xml`,
//! `meta.xml`, `styles.xml`, and a `Pictures/` folder; metadata lives in
//! `office:meta`; text nodes use `text:s`/`text:tab`/`text:line-break`
//! whitespace elements. The encryption probe runs before any parsing.

mod odp;
mod ods;
mod odt;

pub use odp::read_odp;
pub use ods::read_ods;
pub use odt::read_odt;

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use crate::mime::image_mime_for_name;
use crate::types::{ImageRecord, OdfMetadata};
use crate::util::encryption::is_odf_encrypted;
use crate::util::image_size::probe_dimensions;
use crate::util::zip_context::ZipContext;
use roxmltree::{Document, Node};
use tracing::debug;

pub(crate) fn open_odf<'a>(data: &'a [u8], format_name: &str) -> Result<ZipContext<'a>> {
    if is_odf_encrypted(data) {
        return Err(DocsiftError::EncryptedFile(format!("{format_name} file is encrypted")));
    }
    let limits = ExtractionLimits::default();
    ZipContext::open(data, &limits.zip_bomb)
}

/// Metadata from `office:meta` in `meta.xml`.
pub(crate) fn read_odf_metadata(ctx: &mut ZipContext<'_>) -> OdfMetadata {
    let mut metadata = OdfMetadata::default();
    let Ok(xml) = ctx.read_xml("meta.xml") else {
        return metadata;
    };
    let Ok(doc) = Document::parse(&xml) else {
        return metadata;
    };
    let Some(meta) = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "meta")
    else {
        return metadata;
    };

    for node in meta.children().filter(|n| n.is_element()) {
        let text = node.text().unwrap_or("").to_string();
        if text.is_empty() {
            continue;
        }
        match node.tag_name().name() {
            "title" => metadata.title = text,
            "creator" => metadata.creator = text,
            "subject" => metadata.subject = text,
            "description" => metadata.description = text,
            "date" => metadata.date = text,
            "language" => metadata.language = text,
            "keyword" => metadata.keywords = text,
            "initial-creator" => metadata.initial_creator = text,
            "creation-date" => metadata.creation_date = text,
            "editing-cycles" => metadata.editing_cycles = text,
            "editing-duration" => metadata.editing_duration = text,
            "generator" => metadata.generator = text,
            _ => {}
        }
    }
    metadata
}

/// Recursive textification: `text:s` expands to N spaces, `text:tab` to a
/// tab, `text:line-break` to a newline; notes and annotations are skipped
/// (they are extracted separately).
pub(crate) fn text_recursive(element: Node) -> String {
    let mut parts = String::new();
    for child in element.children() {
        if child.is_text() {
            parts.push_str(child.text().unwrap_or(""));
            continue;
        }
        if !child.is_element() {
            continue;
        }
        match child.tag_name().name() {
            "s" => {
                let count: usize = child.attribute_ns_any("c").and_then(|v| v.parse().ok()).unwrap_or(1);
                parts.push_str(&" ".repeat(count));
            }
            "tab" => parts.push('\t'),
            "line-break" => parts.push('\n'),
            "note" | "annotation" => {}
            _ => parts.push_str(&text_recursive(child)),
        }
    }
    parts
}

/// `attribute_ns_any` helper: look an attribute up by local name only.
pub(crate) trait AttrByLocalName<'a> {
    fn attribute_ns_any(&self, local_name: &str) -> Option<&'a str>;
}

impl<'a, 'input> AttrByLocalName<'a> for Node<'a, 'input> {
    fn attribute_ns_any(&self, local_name: &str) -> Option<&'a str> {
        self.attributes()
            .find(|a| a.name() == local_name)
            .map(|a| a.value())
    }
}

pub(crate) fn descendants_named<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a
where
    'input: 'a,
{
    node.descendants()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

pub(crate) fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Read a `Pictures/` payload into an image record; read failures yield
/// a best-effort record with the error field set.
pub(crate) fn load_image(
    ctx: &mut ZipContext<'_>,
    href: &str,
    name: &str,
    image_index: u32,
    unit_index: Option<u32>,
    caption: String,
    description: String,
) -> ImageRecord {
    match ctx.read_bytes(href) {
        Ok(payload) => {
            let (width, height) = probe_dimensions(&payload);
            ImageRecord {
                image_index,
                unit_index,
                name: name.to_string(),
                content_type: image_mime_for_name(href).to_string(),
                size_bytes: payload.len() as u64,
                width,
                height,
                caption,
                description,
                data: Some(payload),
                ..Default::default()
            }
        }
        Err(e) => {
            debug!("Failed to extract image '{href}': {e}");
            ImageRecord {
                image_index,
                unit_index,
                name: name.to_string(),
                caption,
                description,
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    pub fn meta_xml() -> String {
        r#"<?xml version="1.0"?>
<office:document-meta xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0">
<office:meta>
  <dc:title>ODF Title</dc:title>
  <dc:creator>An Editor</dc:creator>
  <meta:generator>docsift-tests</meta:generator>
  <meta:initial-creator>First Author</meta:initial-creator>
</office:meta>
</office:document-meta>"#
            .to_string()
    }

    pub fn build_package(content_xml: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options: FileOptions<()> = FileOptions::default();
            writer.start_file("content.xml", options).unwrap();
            writer.write_all(content_xml.as_bytes()).unwrap();
            writer.start_file("meta.xml", options).unwrap();
            writer.write_all(meta_xml().as_bytes()).unwrap();
            writer.start_file("META-INF/manifest.xml", options).unwrap();
            writer
                .write_all(b"<manifest:manifest xmlns:manifest=\"urn:oasis:names:tc:opendocument:xmlns:manifest:1.0\"/>")
                .unwrap();
            for (name, data) in extra {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    pub const CONTENT_NS_DECLS: &str = r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" xmlns:svg="urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0" xmlns:presentation="urn:oasis:names:tc:opendocument:xmlns:presentation:1.0" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:dc="http://purl.org/dc/elements/1.1/""#;
}
