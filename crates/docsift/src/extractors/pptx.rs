//! PPTX decoder.
//!
//! Slide order comes from `p:sldIdLst` joined with the presentation
//! relationships. Within a slide, shapes are sorted by their (y, x)
//! offset; placeholders without an explicit offset get defaults so
//! titles sort first and footers/unanchored shapes last. Comments are
//! appended behind all visible content.

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use crate::mime::image_mime_for_name;
use crate::types::{
    Comment, ExtractedContent, Formula, ImageRecord, PptxContent, PptxMetadata, PptxSlide,
};
use crate::util::encryption::is_ooxml_encrypted;
use crate::util::image_size::probe_dimensions;
use crate::util::omml::omml_to_latex;
use crate::util::zip_context::ZipContext;
use roxmltree::{Document, Node};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

const TITLE_TYPES: &[&str] = &["title", "ctrTitle"];
const BODY_TYPES: &[&str] = &["body", "subTitle", "obj", "tbl"];
const SKIP_TYPES: &[&str] = &["dt", "sldImg", "hdr"];

/// Sort keys for shapes that inherit their position from the layout.
const POS_COMMENT: (i64, i64) = (999_999, 999_999);
const POS_FOOTER: (i64, i64) = (999_999_998, 0);
const POS_UNANCHORED: (i64, i64) = (999_999_999, 999_999_999);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Title,
    Content,
    Other,
    Table,
    ImageCaption,
    Formula,
    Comment,
}

pub fn read_pptx(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    if is_ooxml_encrypted(data) {
        return Err(DocsiftError::EncryptedFile("PPTX file is encrypted".to_string()));
    }

    let limits = ExtractionLimits::default();
    let mut ctx = ZipContext::open(data, &limits.zip_bomb)?;

    let mut metadata = read_metadata(&mut ctx);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    let slide_paths = slide_order(&mut ctx)?;

    let mut slides = Vec::with_capacity(slide_paths.len());
    let mut images = Vec::new();
    for (idx, slide_path) in slide_paths.iter().enumerate() {
        let slide_number = (idx + 1) as u32;
        let slide = process_slide(&mut ctx, slide_path, slide_number, &mut images);
        slides.push(slide);
    }

    Ok(vec![ExtractedContent::Pptx(PptxContent {
        metadata,
        slides,
        images,
    })])
}

fn read_metadata(ctx: &mut ZipContext<'_>) -> PptxMetadata {
    let mut metadata = PptxMetadata::default();
    let Ok(xml) = ctx.read_xml("docProps/core.xml") else {
        return metadata;
    };
    let Ok(doc) = Document::parse(&xml) else {
        return metadata;
    };
    for node in doc.root_element().children().filter(|n| n.is_element()) {
        let text = node.text().unwrap_or("").to_string();
        if text.is_empty() {
            continue;
        }
        match node.tag_name().name() {
            "title" => metadata.title = text,
            "subject" => metadata.subject = text,
            "creator" => metadata.author = text,
            "lastModifiedBy" => metadata.last_modified_by = text,
            "created" => metadata.created = text,
            "modified" => metadata.modified = text,
            "keywords" => metadata.keywords = text,
            "description" => metadata.comments = text,
            "category" => metadata.category = text,
            "revision" => metadata.revision = text.parse().ok(),
            _ => {}
        }
    }
    metadata
}

/// Presentation order: `p:sldIdLst` r:ids resolved through the
/// presentation rels to slide part paths.
fn slide_order(ctx: &mut ZipContext<'_>) -> Result<Vec<String>> {
    let rels_xml = ctx.read_xml("ppt/_rels/presentation.xml.rels")?;
    let rels = Document::parse(&rels_xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse presentation rels: {e}")))?;

    let mut rel_map: HashMap<String, String> = HashMap::new();
    for rel in rels
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
    {
        let rel_type = rel.attribute("Type").unwrap_or("").to_lowercase();
        if !rel_type.contains("slide") {
            continue;
        }
        let id = rel.attribute("Id").unwrap_or("").to_string();
        let target = rel.attribute("Target").unwrap_or("");
        let full_path = if let Some(relative) = target.strip_prefix("../") {
            format!("ppt/{relative}")
        } else {
            format!("ppt/{target}")
        };
        rel_map.insert(id, full_path);
    }

    let presentation_xml = ctx.read_xml("ppt/presentation.xml")?;
    let presentation = Document::parse(&presentation_xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse ppt/presentation.xml: {e}")))?;

    let mut order = Vec::new();
    if let Some(sld_id_lst) = presentation
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "sldIdLst")
    {
        for sld_id in sld_id_lst
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "sldId")
        {
            if let Some(r_id) = sld_id.attribute((R_NS, "id"))
                && let Some(path) = rel_map.get(r_id)
            {
                order.push(path.clone());
            }
        }
    }
    Ok(order)
}

fn slide_relationships(ctx: &mut ZipContext<'_>, slide_path: &str) -> HashMap<String, (String, String)> {
    let mut map = HashMap::new();
    let rels_path = match slide_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => return map,
    };
    let Ok(xml) = ctx.read_xml(&rels_path) else {
        return map;
    };
    let Ok(doc) = Document::parse(&xml) else {
        return map;
    };
    for rel in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
    {
        map.insert(
            rel.attribute("Id").unwrap_or("").to_string(),
            (
                rel.attribute("Type").unwrap_or("").to_string(),
                rel.attribute("Target").unwrap_or("").to_string(),
            ),
        );
    }
    map
}

fn process_slide(
    ctx: &mut ZipContext<'_>,
    slide_path: &str,
    slide_number: u32,
    all_images: &mut Vec<ImageRecord>,
) -> PptxSlide {
    let rels = slide_relationships(ctx, slide_path);
    let Ok(slide_xml) = ctx.read_xml(slide_path) else {
        return PptxSlide {
            slide_number,
            ..Default::default()
        };
    };
    let Ok(doc) = Document::parse(&slide_xml) else {
        return PptxSlide {
            slide_number,
            ..Default::default()
        };
    };

    let mut slide = PptxSlide {
        slide_number,
        ..Default::default()
    };
    let mut ordered: Vec<((i64, i64), ContentKind, String)> = Vec::new();

    let Some(sp_tree) = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "spTree")
    else {
        return slide;
    };

    // Collect shapes by kind with their sort position.
    let mut shapes: Vec<(&str, Node, (i64, i64))> = Vec::new();
    for node in sp_tree.descendants().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "sp" => shapes.push(("sp", node, shape_position(node))),
            "pic" => shapes.push(("pic", node, shape_position(node))),
            "graphicFrame" => shapes.push(("graphicFrame", node, shape_position(node))),
            _ => {}
        }
    }
    shapes.sort_by_key(|(_, _, pos)| *pos);

    let slide_dir = slide_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");

    for (shape_kind, shape, position) in shapes {
        match shape_kind {
            "pic" => {
                if let Some(record) = extract_picture(ctx, shape, &rels, slide_dir, slide_number, all_images.len()) {
                    if !record.description.is_empty() {
                        ordered.push((
                            position,
                            ContentKind::ImageCaption,
                            format!("[Image: {}]", record.description),
                        ));
                    }
                    all_images.push(record);
                }
            }
            "graphicFrame" => {
                if let Some(rows) = table_from_graphic_frame(shape) {
                    let table_text = rows
                        .iter()
                        .map(|row| row.join("\t"))
                        .collect::<Vec<_>>()
                        .join("\n")
                        .trim()
                        .to_string();
                    if !table_text.is_empty() {
                        ordered.push((position, ContentKind::Table, table_text));
                    }
                }
            }
            _ => {
                process_text_shape(shape, position, &mut slide, &mut ordered);
            }
        }
    }

    // Comments sort behind all positioned content.
    for comment in slide_comments(ctx, slide_number) {
        ordered.push((
            POS_COMMENT,
            ContentKind::Comment,
            format!("[Comment: {}@{}: {}]", comment.author, comment.date, comment.text),
        ));
        slide.comments.push(comment);
    }

    ordered.sort_by_key(|(pos, _, _)| *pos);

    slide.text = ordered
        .iter()
        .map(|(_, _, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    slide.base_text = ordered
        .iter()
        .filter(|(_, kind, _)| {
            matches!(
                kind,
                ContentKind::Title | ContentKind::Content | ContentKind::Other | ContentKind::Table
            )
        })
        .map(|(_, _, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    slide
}

fn process_text_shape(
    shape: Node,
    position: (i64, i64),
    slide: &mut PptxSlide,
    ordered: &mut Vec<((i64, i64), ContentKind, String)>,
) {
    // Formulas are emitted even when the shape has no plain text.
    for (latex, is_display) in formulas_in_element(shape) {
        let rendered = if is_display {
            format!("$${latex}$$")
        } else {
            format!("${latex}$")
        };
        ordered.push((position, ContentKind::Formula, rendered));
        slide.formulas.push(Formula { latex, is_display });
    }

    let Some(tx_body) = child_named(shape, "txBody") else {
        return;
    };
    let text = paragraphs_text(tx_body).trim().to_string();
    if text.is_empty() {
        return;
    }

    let ph = placeholder(shape);
    match ph {
        Some((ph_type, ph_idx)) => {
            if TITLE_TYPES.contains(&ph_type.as_str()) {
                slide.title = text.clone();
                ordered.push((position, ContentKind::Title, text));
            } else if ph_type == "ftr" {
                slide.footer = text;
            } else if SKIP_TYPES.contains(&ph_type.as_str()) {
                // Date, slide-image, and header placeholders carry no
                // useful slide text.
            } else if BODY_TYPES.contains(&ph_type.as_str()) || (ph_type.is_empty() && !ph_idx.is_empty()) {
                slide.content_placeholders.push(text.clone());
                ordered.push((position, ContentKind::Content, text));
            } else {
                slide.other_textboxes.push(text.clone());
                ordered.push((position, ContentKind::Other, text));
            }
        }
        None => {
            slide.other_textboxes.push(text.clone());
            ordered.push((position, ContentKind::Other, text));
        }
    }
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn descendant_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn placeholder(shape: Node) -> Option<(String, String)> {
    let nv_sp_pr = child_named(shape, "nvSpPr")?;
    let nv_pr = child_named(nv_sp_pr, "nvPr")?;
    let ph = child_named(nv_pr, "ph")?;
    Some((
        ph.attribute("type").unwrap_or("").to_string(),
        ph.attribute("idx").unwrap_or("").to_string(),
    ))
}

/// Sort key for a shape: the explicit `a:off` (y, x) when present,
/// otherwise a placeholder-derived default.
fn shape_position(shape: Node) -> (i64, i64) {
    if let Some(off) = descendant_named(shape, "xfrm").and_then(|xfrm| child_named(xfrm, "off")) {
        let x = off.attribute("x").and_then(|v| v.parse().ok()).unwrap_or(0);
        let y = off.attribute("y").and_then(|v| v.parse().ok()).unwrap_or(0);
        return (y, x);
    }

    if let Some((ph_type, ph_idx)) = placeholder(shape) {
        if TITLE_TYPES.contains(&ph_type.as_str()) {
            return (0, 0);
        }
        if BODY_TYPES.contains(&ph_type.as_str()) || (ph_type.is_empty() && !ph_idx.is_empty()) {
            let idx: i64 = ph_idx.parse().unwrap_or(0);
            return (1 + idx, 0);
        }
        if ph_type == "ftr" || ph_type == "sldNum" {
            return POS_FOOTER;
        }
    }
    POS_UNANCHORED
}

/// Paragraph-joined text of a `txBody`. Line breaks become vertical
/// tabs, field runs contribute their cached text.
fn paragraphs_text(tx_body: Node) -> String {
    let mut paragraphs = Vec::new();
    for p in tx_body
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
    {
        let mut texts = String::new();
        for child in p.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "r" | "fld" => {
                    if let Some(t) = child_named(child, "t")
                        && let Some(text) = t.text()
                    {
                        texts.push_str(text);
                    }
                }
                "br" => texts.push('\u{b}'),
                "t" => {
                    if let Some(text) = child.text() {
                        texts.push_str(text);
                    }
                }
                _ => {}
            }
        }
        paragraphs.push(texts);
    }
    paragraphs.join("\n")
}

fn table_from_graphic_frame(frame: Node) -> Option<Vec<Vec<String>>> {
    let graphic_data = descendant_named(frame, "graphicData")?;
    if graphic_data.attribute("uri") != Some(TABLE_URI) {
        return None;
    }
    let tbl = descendant_named(graphic_data, "tbl")?;

    let mut rows = Vec::new();
    for tr in tbl.children().filter(|n| n.is_element() && n.tag_name().name() == "tr") {
        let row: Vec<String> = tr
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "tc")
            .map(|tc| {
                child_named(tc, "txBody")
                    .map(|body| paragraphs_text(body).trim().to_string())
                    .unwrap_or_default()
            })
            .collect();
        rows.push(row);
    }
    Some(rows)
}

fn formulas_in_element(elem: Node) -> Vec<(String, bool)> {
    let mut formulas = Vec::new();
    let mut seen_inline: HashSet<roxmltree::NodeId> = HashSet::new();

    for omath_para in elem
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "oMathPara")
    {
        if let Some(omath) = child_named(omath_para, "oMath") {
            seen_inline.insert(omath.id());
            let latex = omml_to_latex(omath);
            if !latex.trim().is_empty() {
                formulas.push((latex, true));
            }
        }
    }
    for omath in elem
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "oMath")
    {
        if seen_inline.contains(&omath.id()) {
            continue;
        }
        let latex = omml_to_latex(omath);
        if !latex.trim().is_empty() {
            formulas.push((latex, false));
        }
    }
    formulas
}

fn extract_picture(
    ctx: &mut ZipContext<'_>,
    pic: Node,
    rels: &HashMap<String, (String, String)>,
    slide_dir: &str,
    slide_number: u32,
    images_so_far: usize,
) -> Option<ImageRecord> {
    let blip = descendant_named(pic, "blip")?;
    let embed = blip.attribute((R_NS, "embed"))?;
    let (_, target) = rels.get(embed)?;

    let image_path = normalize_relative_path(slide_dir, target);

    let (caption, description) = match descendant_named(pic, "cNvPr") {
        Some(c_nv_pr) => (
            c_nv_pr.attribute("name").unwrap_or("").to_string(),
            c_nv_pr.attribute("descr").unwrap_or("").to_string(),
        ),
        None => (String::new(), String::new()),
    };

    match ctx.read_bytes(&image_path) {
        Ok(payload) => {
            let (width, height) = probe_dimensions(&payload);
            Some(ImageRecord {
                image_index: (images_so_far + 1) as u32,
                unit_index: Some(slide_number),
                name: image_path.rsplit('/').next().unwrap_or(&image_path).to_string(),
                content_type: image_mime_for_name(target).to_string(),
                size_bytes: payload.len() as u64,
                width,
                height,
                caption,
                description,
                data: Some(payload),
                ..Default::default()
            })
        }
        Err(e) => {
            debug!("Failed to extract image on slide {slide_number}: {e}");
            None
        }
    }
}

/// Resolve a slide-relative target, refusing to escape the archive root.
fn normalize_relative_path(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        let parts: Vec<&str> = absolute.split('/').filter(|p| !p.is_empty() && *p != "..").collect();
        return format!("{base_dir}/{}", parts.join("/"));
    }

    if target.split('/').any(|part| part == "..") {
        if target.starts_with("../") {
            let mut normalized: Vec<&str> = Vec::new();
            let joined = format!("{base_dir}/{target}");
            for part in joined.split('/') {
                match part {
                    ".." => {
                        normalized.pop();
                    }
                    "" => {}
                    part => normalized.push(part),
                }
            }
            return normalized.join("/");
        }
        let parts: Vec<&str> = target.split('/').filter(|p| !p.is_empty() && *p != "..").collect();
        return format!("{base_dir}/{}", parts.join("/"));
    }

    format!("{base_dir}/{target}")
}

fn slide_comments(ctx: &mut ZipContext<'_>, slide_number: u32) -> Vec<Comment> {
    let path = format!("ppt/comments/comment{slide_number}.xml");
    let Ok(xml) = ctx.read_xml(&path) else {
        return Vec::new();
    };
    let Ok(doc) = Document::parse(&xml) else {
        return Vec::new();
    };

    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "cm")
        .map(|cm| Comment {
            id: cm.attribute("idx").unwrap_or("").to_string(),
            author: cm.attribute("authorId").unwrap_or("").to_string(),
            date: cm.attribute("dt").unwrap_or("").to_string(),
            text: descendant_named(cm, "text")
                .and_then(|t| t.text())
                .unwrap_or("")
                .to_string(),
        })
        .collect()
}
