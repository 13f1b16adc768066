//! ODT (OpenDocument Text) decoder.

use super::{
    AttrByLocalName, child_named, descendants_named, load_image, open_odf, read_odf_metadata, text_recursive,
};
use crate::error::{DocsiftError, Result};
use crate::types::{
    Bookmark, Comment, ExtractedContent, HeaderFooter, Hyperlink, ImageRecord, Note, OdtContent, OdtParagraph, Table,
};
use crate::util::zip_context::ZipContext;
use roxmltree::{Document, Node};

pub fn read_odt(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let mut ctx = open_odf(data, "ODT")?;

    let content_xml = ctx.read_xml("content.xml")?;
    let doc = Document::parse(&content_xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse content.xml: {e}")))?;
    let body = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "body")
        .ok_or_else(|| DocsiftError::parsing("content.xml has no office:body"))?;

    let mut metadata = read_odf_metadata(&mut ctx);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    let paragraphs = extract_paragraphs(body);
    let tables = extract_tables(body);
    let hyperlinks = extract_hyperlinks(body);
    let (footnotes, endnotes) = extract_notes(body);
    let comments = extract_annotations(body);
    let bookmarks = extract_bookmarks(body);
    let images = extract_images(&mut ctx, body);
    let text = extract_full_text(body);
    let (headers, footers, styles) = extract_page_styles(&mut ctx);

    Ok(vec![ExtractedContent::Odt(OdtContent {
        metadata,
        paragraphs,
        tables,
        hyperlinks,
        footnotes,
        endnotes,
        comments,
        bookmarks,
        headers,
        footers,
        styles,
        images,
        text,
    })])
}

/// Page headers/footers and named styles live in `styles.xml`: headers
/// and footers under the master pages, style names on `style:style`
/// elements.
fn extract_page_styles(ctx: &mut ZipContext<'_>) -> (Vec<HeaderFooter>, Vec<HeaderFooter>, Vec<String>) {
    let Ok(xml) = ctx.read_xml("styles.xml") else {
        return (Vec::new(), Vec::new(), Vec::new());
    };
    let Ok(doc) = Document::parse(&xml) else {
        return (Vec::new(), Vec::new(), Vec::new());
    };
    let root = doc.root_element();

    let mut headers = Vec::new();
    let mut footers = Vec::new();
    for node in root.descendants().filter(|n| n.is_element()) {
        let kind = match node.tag_name().name() {
            "header" => "header",
            "header-left" => "header_left",
            "footer" => "footer",
            "footer-left" => "footer_left",
            _ => continue,
        };
        let text = descendants_named(node, "p")
            .map(text_recursive)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }
        let record = HeaderFooter {
            kind: kind.to_string(),
            text,
        };
        if kind.starts_with("header") {
            headers.push(record);
        } else {
            footers.push(record);
        }
    }

    let mut styles: Vec<String> = root
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "style")
        .filter_map(|style| style.attribute_ns_any("name"))
        .map(str::to_string)
        .collect();
    styles.sort();
    styles.dedup();

    (headers, footers, styles)
}

fn extract_paragraphs(body: Node) -> Vec<OdtParagraph> {
    body.descendants()
        .filter(|n| n.is_element() && matches!(n.tag_name().name(), "p" | "h"))
        .map(|elem| {
            let outline_level = if elem.tag_name().name() == "h" {
                elem.attribute_ns_any("outline-level")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0)
            } else {
                0
            };
            OdtParagraph {
                text: text_recursive(elem),
                style: elem.attribute_ns_any("style-name").unwrap_or("").to_string(),
                outline_level,
            }
        })
        .collect()
}

fn extract_tables(body: Node) -> Vec<Table> {
    descendants_named(body, "table")
        .map(|table| {
            let rows = descendants_named(table, "table-row")
                .map(|row| {
                    descendants_named(row, "table-cell")
                        .map(|cell| {
                            descendants_named(cell, "p")
                                .map(text_recursive)
                                .collect::<Vec<_>>()
                                .join("\n")
                        })
                        .collect()
                })
                .collect();
            Table { rows }
        })
        .collect()
}

fn extract_hyperlinks(body: Node) -> Vec<Hyperlink> {
    descendants_named(body, "a")
        .filter_map(|link| {
            let href = link.attribute_ns_any("href")?;
            if href.is_empty() {
                return None;
            }
            Some(Hyperlink {
                text: text_recursive(link),
                url: href.to_string(),
            })
        })
        .collect()
}

/// Footnotes and endnotes, split on `text:note-class`.
fn extract_notes(body: Node) -> (Vec<Note>, Vec<Note>) {
    let mut footnotes = Vec::new();
    let mut endnotes = Vec::new();

    for note in descendants_named(body, "note") {
        let note_class = note.attribute_ns_any("note-class").unwrap_or("footnote");
        let text = child_named(note, "note-body")
            .map(|note_body| {
                descendants_named(note_body, "p")
                    .map(text_recursive)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        let record = Note {
            id: note.attribute_ns_any("id").unwrap_or("").to_string(),
            text,
        };
        if note_class == "endnote" {
            endnotes.push(record);
        } else {
            footnotes.push(record);
        }
    }
    (footnotes, endnotes)
}

fn extract_annotations(body: Node) -> Vec<Comment> {
    descendants_named(body, "annotation")
        .map(|annotation| Comment {
            id: String::new(),
            author: child_named(annotation, "creator")
                .and_then(|n| n.text())
                .unwrap_or("")
                .to_string(),
            date: child_named(annotation, "date")
                .and_then(|n| n.text())
                .unwrap_or("")
                .to_string(),
            text: descendants_named(annotation, "p")
                .map(text_recursive)
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .collect()
}

fn extract_bookmarks(body: Node) -> Vec<Bookmark> {
    let mut bookmarks = Vec::new();
    for name in ["bookmark", "bookmark-start"] {
        for bookmark in descendants_named(body, name) {
            if let Some(bookmark_name) = bookmark.attribute_ns_any("name")
                && !bookmark_name.is_empty()
            {
                bookmarks.push(Bookmark {
                    name: bookmark_name.to_string(),
                    text: String::new(),
                });
            }
        }
    }
    bookmarks
}

/// Images appear either inside a text-box frame (captioned: the caption
/// is the paragraph text around the inner image) or as bare frames
/// (caption from `svg:title`, description from `svg:desc`).
fn extract_images(ctx: &mut ZipContext<'_>, body: Node) -> Vec<ImageRecord> {
    let mut images = Vec::new();
    let mut processed_hrefs: Vec<String> = Vec::new();

    // Captioned images: draw:frame > draw:text-box > text:p > draw:frame
    // > draw:image.
    for outer_frame in descendants_named(body, "frame") {
        let Some(text_box) = child_named(outer_frame, "text-box") else {
            continue;
        };
        for para in descendants_named(text_box, "p") {
            let Some(inner_frame) = child_named(para, "frame") else {
                continue;
            };
            let Some(image_elem) = child_named(inner_frame, "image") else {
                continue;
            };
            let Some(href) = image_elem.attribute_ns_any("href") else {
                continue;
            };
            if href.is_empty() || href.starts_with("http") {
                continue;
            }
            processed_hrefs.push(href.to_string());

            let caption = caption_from_paragraph(para);
            let description = child_named(inner_frame, "desc")
                .and_then(|n| n.text())
                .unwrap_or("")
                .to_string();
            let name = inner_frame
                .attribute_ns_any("name")
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| href.rsplit('/').next().unwrap_or(href));

            if ctx.has_entry(href) {
                let index = (images.len() + 1) as u32;
                images.push(load_image(ctx, href, name, index, None, caption, description));
            }
        }
    }

    // Bare frames.
    for frame in descendants_named(body, "frame") {
        if child_named(frame, "text-box").is_some() {
            continue;
        }
        let Some(image_elem) = child_named(frame, "image") else {
            continue;
        };
        let Some(href) = image_elem.attribute_ns_any("href") else {
            continue;
        };
        if href.is_empty() || href.starts_with("http") || processed_hrefs.iter().any(|h| h.as_str() == href) {
            continue;
        }

        let name = frame.attribute_ns_any("name").unwrap_or("").to_string();
        let mut caption = child_named(frame, "title")
            .and_then(|n| n.text())
            .unwrap_or("")
            .to_string();
        if caption.is_empty() {
            caption = name.clone();
        }
        let description = child_named(frame, "desc")
            .and_then(|n| n.text())
            .unwrap_or("")
            .to_string();

        if ctx.has_entry(href) {
            let index = (images.len() + 1) as u32;
            let display_name = if name.is_empty() {
                href.rsplit('/').next().unwrap_or(href)
            } else {
                name.as_str()
            };
            images.push(load_image(ctx, href, display_name, index, None, caption, description));
        }
    }

    images
}

/// Caption text of a paragraph that wraps an image frame: everything but
/// the frame itself, whitespace-normalized.
fn caption_from_paragraph(para: Node) -> String {
    let mut parts = String::new();
    for child in para.children() {
        if child.is_text() {
            parts.push_str(child.text().unwrap_or(""));
            continue;
        }
        if !child.is_element() {
            continue;
        }
        match child.tag_name().name() {
            "frame" => {}
            "sequence" => parts.push_str(child.text().unwrap_or("")),
            "s" => {
                let count: usize = child.attribute_ns_any("c").and_then(|v| v.parse().ok()).unwrap_or(1);
                parts.push_str(&" ".repeat(count));
            }
            "tab" => parts.push('\t'),
            "line-break" => parts.push('\n'),
            _ => parts.push_str(&text_recursive(child)),
        }
    }
    parts.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Document-order full text: paragraphs, headings, table cells, and
/// list items.
fn extract_full_text(body: Node) -> String {
    let mut output = Vec::new();
    append_full_text(body, &mut output);
    output.join("\n")
}

fn append_full_text(elem: Node, output: &mut Vec<String>) {
    match elem.tag_name().name() {
        "p" | "h" => {
            let text = text_recursive(elem);
            if !text.trim().is_empty() {
                output.push(text);
            }
        }
        "table" => {
            for row in descendants_named(elem, "table-row") {
                for cell in descendants_named(row, "table-cell") {
                    for p in descendants_named(cell, "p") {
                        let text = text_recursive(p);
                        if !text.trim().is_empty() {
                            output.push(text);
                        }
                    }
                }
            }
        }
        "list" => {
            for item in descendants_named(elem, "list-item") {
                for p in descendants_named(item, "p") {
                    let text = text_recursive(p);
                    if !text.trim().is_empty() {
                        output.push(text);
                    }
                }
            }
        }
        _ => {
            for child in elem.children().filter(|n| n.is_element()) {
                append_full_text(child, output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{CONTENT_NS_DECLS, build_package};
    use super::*;
    use crate::types::Content;

    fn content(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><office:document-content {CONTENT_NS_DECLS}><office:body><office:text>{body}</office:text></office:body></office:document-content>"#
        )
    }

    #[test]
    fn test_paragraphs_headings_and_text() {
        let body = r#"<text:h text:style-name="Heading_1" text:outline-level="1">Intro</text:h>
<text:p text:style-name="Standard">First<text:s text:c="3"/>spaced</text:p>
<text:p>With<text:tab/>tab and<text:line-break/>break</text:p>"#;
        let data = build_package(&content(body), &[]);
        let results = read_odt(&data, Some("doc.odt")).unwrap();
        let ExtractedContent::Odt(odt) = &results[0] else {
            panic!("expected odt content");
        };

        assert_eq!(odt.metadata.title, "ODF Title");
        assert_eq!(odt.paragraphs.len(), 3);
        assert_eq!(odt.paragraphs[0].text, "Intro");
        assert_eq!(odt.paragraphs[0].outline_level, 1);
        assert_eq!(odt.paragraphs[1].text, "First   spaced");
        assert_eq!(odt.paragraphs[2].text, "With\ttab and\nbreak");
        assert!(results[0].full_text().starts_with("Intro\nFirst   spaced"));
    }

    #[test]
    fn test_tables_notes_comments_bookmarks() {
        let body = r#"<text:p>Lead<text:note text:id="ftn1" text:note-class="footnote"><text:note-body><text:p>a footnote</text:p></text:note-body></text:note></text:p>
<text:p><text:bookmark text:name="mark1"/><text:a xlink:href="https://example.com">link text</text:a></text:p>
<office:annotation><dc:creator>Reviewer</dc:creator><dc:date>2024-01-01</dc:date><text:p>looks good</text:p></office:annotation>
<table:table table:name="T"><table:table-row><table:table-cell><text:p>c1</text:p></table:table-cell><table:table-cell><text:p>c2</text:p></table:table-cell></table:table-row></table:table>"#;
        let data = build_package(&content(body), &[]);
        let results = read_odt(&data, None).unwrap();
        let ExtractedContent::Odt(odt) = &results[0] else {
            panic!("expected odt content");
        };

        assert_eq!(odt.footnotes.len(), 1);
        assert_eq!(odt.footnotes[0].text, "a footnote");
        assert!(odt.endnotes.is_empty());
        assert_eq!(odt.bookmarks[0].name, "mark1");
        assert_eq!(odt.hyperlinks[0].url, "https://example.com");
        assert_eq!(odt.comments[0].author, "Reviewer");
        assert_eq!(odt.tables[0].rows, vec![vec!["c1".to_string(), "c2".to_string()]]);
        // The footnote body stays out of the main text.
        assert!(!odt.text.contains("a footnote"));
        assert!(odt.text.contains("Lead"));
    }

    #[test]
    fn test_captioned_image() {
        let png = [
            0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R', 0, 0, 0, 4, 0, 0, 0,
            2, 8, 0, 0, 0, 0,
        ];
        let body = r#"<text:p><draw:frame draw:name="OuterFrame"><draw:text-box>
<text:p><draw:frame draw:name="Bild1"><draw:image xlink:href="Pictures/img.png"/></draw:frame>Figure <text:sequence>1</text:sequence>: a nice chart</text:p>
</draw:text-box></draw:frame></text:p>"#;
        let data = build_package(&content(body), &[("Pictures/img.png", &png)]);
        let results = read_odt(&data, None).unwrap();
        let ExtractedContent::Odt(odt) = &results[0] else {
            panic!("expected odt content");
        };

        assert_eq!(odt.images.len(), 1);
        let image = &odt.images[0];
        assert_eq!(image.image_index, 1);
        assert_eq!(image.caption, "Figure 1: a nice chart");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.width, Some(4));
        assert_eq!(image.height, Some(2));
    }

    #[test]
    fn test_page_headers_and_styles() {
        let styles = format!(
            r#"<?xml version="1.0"?><office:document-styles {CONTENT_NS_DECLS} xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0">
<office:styles>
  <style:style style:name="Standard" style:family="paragraph"/>
  <style:style style:name="Heading_1" style:family="paragraph"/>
</office:styles>
<office:master-styles><style:master-page style:name="Default">
  <style:header><text:p>Running header</text:p></style:header>
  <style:footer><text:p>Page footer</text:p></style:footer>
</style:master-page></office:master-styles>
</office:document-styles>"#
        );
        let data = build_package(
            &content("<text:p>body</text:p>"),
            &[("styles.xml", styles.as_bytes())],
        );
        let results = read_odt(&data, None).unwrap();
        let ExtractedContent::Odt(odt) = &results[0] else {
            panic!("expected odt content");
        };
        assert_eq!(odt.headers.len(), 1);
        assert_eq!(odt.headers[0].text, "Running header");
        assert_eq!(odt.footers[0].text, "Page footer");
        assert_eq!(odt.styles, vec!["Heading_1".to_string(), "Standard".to_string()]);
    }

    #[test]
    fn test_encrypted_odt_rejected() {
        use std::io::Write;
        use zip::write::{FileOptions, ZipWriter};
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options: FileOptions<()> = FileOptions::default();
            writer.start_file("META-INF/manifest.xml", options).unwrap();
            writer
                .write_all(b"<manifest:manifest><manifest:encryption-data/></manifest:manifest>")
                .unwrap();
            writer.finish().unwrap();
        }
        assert!(matches!(
            read_odt(&cursor.into_inner(), None),
            Err(DocsiftError::EncryptedFile(_))
        ));
    }
}
