//! ODP (OpenDocument Presentation) decoder.

use super::{
    AttrByLocalName, child_named, descendants_named, load_image, open_odf, read_odf_metadata, text_recursive,
};
use crate::error::{DocsiftError, Result};
use crate::types::{ExtractedContent, ImageRecord, OdpContent, OdpSlide, Table};
use crate::util::zip_context::ZipContext;
use roxmltree::{Document, Node};

pub fn read_odp(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let mut ctx = open_odf(data, "ODP")?;

    let content_xml = ctx.read_xml("content.xml")?;
    let doc = Document::parse(&content_xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse content.xml: {e}")))?;

    let mut metadata = read_odf_metadata(&mut ctx);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    let pages: Vec<Node> = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "page")
        .collect();

    let mut slides = Vec::with_capacity(pages.len());
    let mut images = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        let slide = extract_slide(&mut ctx, *page, (idx + 1) as u32, &mut images);
        slides.push(slide);
    }

    Ok(vec![ExtractedContent::Odp(OdpContent {
        metadata,
        slides,
        images,
    })])
}

/// Numeric prefix of an ODF length ("2.54cm" → 2.54).
fn parse_position(value: Option<&str>) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    let numeric: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+')
        .collect();
    numeric.parse().unwrap_or(0.0)
}

fn extract_slide(
    ctx: &mut ZipContext<'_>,
    page: Node,
    slide_number: u32,
    all_images: &mut Vec<ImageRecord>,
) -> OdpSlide {
    let mut slide = OdpSlide {
        slide_number,
        name: page.attribute_ns_any("name").unwrap_or("").to_string(),
        ..Default::default()
    };

    // Frames sorted by (y, x) for reading order.
    let mut frames: Vec<(f64, f64, Node)> = page
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "frame")
        .map(|frame| {
            (
                parse_position(frame.attribute_ns_any("y")),
                parse_position(frame.attribute_ns_any("x")),
                frame,
            )
        })
        .collect();
    frames.sort_by(|a, b| (a.0, a.1).partial_cmp(&(b.0, b.1)).unwrap_or(std::cmp::Ordering::Equal));

    let mut ordered_text: Vec<String> = Vec::new();
    let mut found_title = false;

    for (_, _, frame) in &frames {
        if let Some(text_box) = child_named(*frame, "text-box") {
            for p in descendants_named(text_box, "p") {
                let text = text_recursive(p).trim().to_string();
                if text.is_empty() {
                    continue;
                }
                let style = p.attribute_ns_any("style-name").unwrap_or("");
                if !found_title && style.contains("Title") {
                    slide.title = text.clone();
                    found_title = true;
                    ordered_text.push(text);
                } else if style.contains("Body") {
                    slide.content.push(text.clone());
                    ordered_text.push(text);
                } else {
                    slide.content.push(text.clone());
                    ordered_text.push(text);
                }
            }
        }

        if let Some(table) = child_named(*frame, "table") {
            let rows: Vec<Vec<String>> = descendants_named(table, "table-row")
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
            if !rows.is_empty() {
                ordered_text.push(
                    rows.iter()
                        .map(|row| row.join("\t"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                );
                slide.tables.push(Table { rows });
            }
        }

        if let Some(image_elem) = child_named(*frame, "image")
            && let Some(href) = image_elem.attribute_ns_any("href")
            && !href.is_empty()
            && !href.starts_with("http")
            && ctx.has_entry(href)
        {
            let caption = child_named(*frame, "title")
                .and_then(|n| n.text())
                .unwrap_or("")
                .to_string();
            let description = child_named(*frame, "desc")
                .and_then(|n| n.text())
                .unwrap_or("")
                .to_string();
            let name = frame
                .attribute_ns_any("name")
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| href.rsplit('/').next().unwrap_or(href));
            let index = (all_images.len() + 1) as u32;
            all_images.push(load_image(
                ctx,
                href,
                name,
                index,
                Some(slide_number),
                caption,
                description,
            ));
        }
    }

    // Speaker notes live under presentation:notes and stay out of the
    // slide text.
    if let Some(notes_elem) = child_named(page, "notes") {
        for frame in descendants_named(notes_elem, "frame") {
            if let Some(text_box) = child_named(frame, "text-box") {
                for p in descendants_named(text_box, "p") {
                    let text = text_recursive(p).trim().to_string();
                    if !text.is_empty() {
                        slide.notes.push(text);
                    }
                }
            }
        }
    }

    slide.text = ordered_text.join("\n");
    slide
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{CONTENT_NS_DECLS, build_package};
    use super::*;
    use crate::types::Content;

    fn presentation(pages: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><office:document-content {CONTENT_NS_DECLS}><office:body><office:presentation>{pages}</office:presentation></office:body></office:document-content>"#
        )
    }

    fn text_frame(y: &str, style: &str, text: &str) -> String {
        format!(
            r#"<draw:frame svg:x="1cm" svg:y="{y}"><draw:text-box><text:p text:style-name="{style}">{text}</text:p></draw:text-box></draw:frame>"#
        )
    }

    #[test]
    fn test_slides_with_title_body_and_order() {
        let page1 = format!(
            r#"<draw:page draw:name="page1">{}{}</draw:page>"#,
            // The body frame is listed first but sits lower on the
            // slide.
            text_frame("8cm", "P1_Body", "Body text"),
            text_frame("1cm", "P1_Title", "Slide Title"),
        );
        let page2 = format!(
            r#"<draw:page draw:name="page2">{}
<presentation:notes><draw:frame svg:y="1cm"><draw:text-box><text:p>speaker note</text:p></draw:text-box></draw:frame></presentation:notes>
</draw:page>"#,
            text_frame("2cm", "P2_Other", "Second slide")
        );
        let data = build_package(&presentation(&format!("{page1}{page2}")), &[]);
        let results = read_odp(&data, Some("deck.odp")).unwrap();
        let ExtractedContent::Odp(odp) = &results[0] else {
            panic!("expected odp content");
        };

        assert_eq!(odp.slides.len(), 2);
        assert_eq!(odp.slides[0].title, "Slide Title");
        assert_eq!(odp.slides[0].text, "Slide Title\nBody text");
        assert_eq!(odp.slides[1].notes, vec!["speaker note".to_string()]);
        assert!(!odp.slides[1].text.contains("speaker note"));

        let units = results[0].units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "Slide Title\nBody text");
    }

    #[test]
    fn test_slide_table() {
        let page = r#"<draw:page draw:name="p"><draw:frame svg:y="1cm"><table:table>
<table:table-row><table:table-cell><text:p>a</text:p></table:table-cell><table:table-cell><text:p>b</text:p></table:table-cell></table:table-row>
</table:table></draw:frame></draw:page>"#;
        let data = build_package(&presentation(page), &[]);
        let results = read_odp(&data, None).unwrap();
        let ExtractedContent::Odp(odp) = &results[0] else {
            panic!("expected odp content");
        };
        assert_eq!(odp.slides[0].tables.len(), 1);
        assert_eq!(odp.slides[0].text, "a\tb");
    }
}
