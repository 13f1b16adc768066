//! DOCX decoder.
//!
//! Single-pass traversal of `word/document.xml` plus its sibling parts
//! (core properties, styles, notes, comments, headers/footers,
//! relationships). Tag matching is namespace-agnostic on local names,
//! with `mc:AlternateContent` resolved to its `mc:Choice` branch only so
//! equation fallbacks never emit duplicate text.

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use crate::mime::image_mime_for_name;
use crate::types::{
    Comment, DocxContent, DocxMetadata, DocxParagraph, DocxRun, ExtractedContent, Formula, HeaderFooter, Hyperlink,
    ImageRecord, Note, Section, Table,
};
use crate::util::encryption::is_ooxml_encrypted;
use crate::util::image_size::probe_dimensions;
use crate::util::omml::omml_to_latex;
use crate::util::zip_context::ZipContext;
use roxmltree::{Document, Node};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const TWIPS_PER_INCH: f64 = 1440.0;

/// Caption-like paragraph styles (case-insensitive substring match).
const CAPTION_STYLE_KEYWORDS: &[&str] = &["caption", "bildunterschrift", "abbildung", "figure"];

pub fn read_docx(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    if is_ooxml_encrypted(data) {
        return Err(DocsiftError::EncryptedFile("DOCX file is encrypted".to_string()));
    }

    let limits = ExtractionLimits::default();
    let mut ctx = ZipContext::open(data, &limits.zip_bomb)?;

    let document_xml = ctx.read_xml("word/document.xml")?;
    let document = Document::parse(&document_xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse word/document.xml: {e}")))?;
    let body = document
        .root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "body");

    // Sibling parts; all optional.
    let core_xml = ctx.read_xml("docProps/core.xml").ok();
    let styles_xml = ctx.read_xml("word/styles.xml").ok();
    let footnotes_xml = ctx.read_xml("word/footnotes.xml").ok();
    let endnotes_xml = ctx.read_xml("word/endnotes.xml").ok();
    let comments_xml = ctx.read_xml("word/comments.xml").ok();
    let rels_xml = ctx.read_xml("word/_rels/document.xml.rels").ok();

    let mut metadata = parse_core_properties(core_xml.as_deref());
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    let styles = parse_styles(styles_xml.as_deref());
    let relationships = parse_relationships(rels_xml.as_deref());

    let paragraphs = body.map(|b| extract_paragraphs(b, &styles)).unwrap_or_default();
    let tables = body.map(extract_tables).unwrap_or_default();
    let sections = body.map(extract_sections).unwrap_or_default();
    let hyperlinks = body.map(|b| extract_hyperlinks(b, &relationships)).unwrap_or_default();
    let formulas = body.map(extract_formulas).unwrap_or_default();
    let footnotes = parse_notes(footnotes_xml.as_deref(), "footnote");
    let endnotes = parse_notes(endnotes_xml.as_deref(), "endnote");
    let comments = parse_comments(comments_xml.as_deref());
    let (headers, footers) = extract_headers_footers(&mut ctx, &relationships);
    let images = extract_images(&mut ctx, &relationships, body);

    let full_text = body.map(|b| full_text_from_body(b, true)).unwrap_or_default();
    let base_full_text = body.map(|b| full_text_from_body(b, false)).unwrap_or_default();

    Ok(vec![ExtractedContent::Docx(DocxContent {
        metadata,
        paragraphs,
        tables,
        headers,
        footers,
        images,
        hyperlinks,
        footnotes,
        endnotes,
        comments,
        sections,
        styles: styles.values().cloned().collect::<std::collections::BTreeSet<_>>().into_iter().collect(),
        formulas,
        full_text,
        base_full_text,
    })])
}

// --- helpers over roxmltree -------------------------------------------------

fn local<'a, 'input>(node: Node<'a, 'input>) -> &'a str {
    node.tag_name().name()
}

fn elem_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn find_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elem_children(node).find(|n| local(*n) == name)
}

fn w_attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((W_NS, name)).or_else(|| node.attribute(name))
}

/// Concatenated `w:t` text of a subtree.
fn subtree_text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_element() && local(*n) == "t")
        .filter_map(|n| n.text())
        .collect()
}

// --- parts ------------------------------------------------------------------

fn parse_core_properties(xml: Option<&str>) -> DocxMetadata {
    let mut metadata = DocxMetadata::default();
    let Some(xml) = xml else {
        return metadata;
    };
    let Ok(doc) = Document::parse(xml) else {
        return metadata;
    };

    for node in doc.root_element().children().filter(|n| n.is_element()) {
        let text = node.text().unwrap_or("").to_string();
        if text.is_empty() {
            continue;
        }
        match local(node) {
            "title" => metadata.title = text,
            "creator" => metadata.author = text,
            "subject" => metadata.subject = text,
            "keywords" => metadata.keywords = text,
            "category" => metadata.category = text,
            "description" => metadata.comments = text,
            "created" => metadata.created = text,
            "modified" => metadata.modified = text,
            "lastModifiedBy" => metadata.last_modified_by = text,
            "revision" => metadata.revision = text.parse().ok(),
            _ => {}
        }
    }
    metadata
}

/// styleId → display name from `word/styles.xml`.
fn parse_styles(xml: Option<&str>) -> HashMap<String, String> {
    let mut styles = HashMap::new();
    let Some(xml) = xml else {
        return styles;
    };
    let Ok(doc) = Document::parse(xml) else {
        return styles;
    };

    for style in doc.descendants().filter(|n| n.is_element() && local(*n) == "style") {
        let Some(style_id) = w_attr(style, "styleId") else {
            continue;
        };
        let name = find_child(style, "name")
            .and_then(|n| w_attr(n, "val"))
            .unwrap_or(style_id);
        styles.insert(style_id.to_string(), name.to_string());
    }
    styles
}

/// rel id → (type, target) from the document relationships part.
fn parse_relationships(xml: Option<&str>) -> Vec<(String, String, String)> {
    let mut rels = Vec::new();
    let Some(xml) = xml else {
        return rels;
    };
    let Ok(doc) = Document::parse(xml) else {
        return rels;
    };

    for rel in doc
        .descendants()
        .filter(|n| n.is_element() && local(*n) == "Relationship")
    {
        rels.push((
            rel.attribute("Id").unwrap_or("").to_string(),
            rel.attribute("Type").unwrap_or("").to_string(),
            rel.attribute("Target").unwrap_or("").to_string(),
        ));
    }
    rels
}

fn parse_notes(xml: Option<&str>, element_name: &str) -> Vec<Note> {
    let mut notes = Vec::new();
    let Some(xml) = xml else {
        return notes;
    };
    let Ok(doc) = Document::parse(xml) else {
        return notes;
    };

    for note in doc
        .descendants()
        .filter(|n| n.is_element() && local(*n) == element_name)
    {
        let id = w_attr(note, "id").unwrap_or("").to_string();
        // Separator (-1) and continuation (0) notes carry no content.
        if id == "-1" || id == "0" {
            continue;
        }
        notes.push(Note {
            id,
            text: subtree_text(note),
        });
    }
    notes
}

fn parse_comments(xml: Option<&str>) -> Vec<Comment> {
    let mut comments = Vec::new();
    let Some(xml) = xml else {
        return comments;
    };
    let Ok(doc) = Document::parse(xml) else {
        return comments;
    };

    for comment in doc.descendants().filter(|n| n.is_element() && local(*n) == "comment") {
        comments.push(Comment {
            id: w_attr(comment, "id").unwrap_or("").to_string(),
            author: w_attr(comment, "author").unwrap_or("").to_string(),
            date: w_attr(comment, "date").unwrap_or("").to_string(),
            text: subtree_text(comment),
        });
    }
    comments
}

// --- body traversal ---------------------------------------------------------

/// Document-order text. With formulas on, inline equations render as
/// `$…$` and display equations as `$$…$$`.
fn full_text_from_body(body: Node, include_formulas: bool) -> String {
    let mut all_text = Vec::new();

    for element in elem_children(body) {
        match local(element) {
            "p" => {
                let text = paragraph_content(element, include_formulas);
                if !text.trim().is_empty() {
                    all_text.push(text);
                }
            }
            "tbl" => {
                for row in element.descendants().filter(|n| n.is_element() && local(*n) == "tr") {
                    let cells: Vec<String> = row
                        .descendants()
                        .filter(|n| n.is_element() && local(*n) == "tc")
                        .map(|cell| {
                            cell.descendants()
                                .filter(|n| n.is_element() && local(*n) == "p")
                                .map(|p| paragraph_content(p, include_formulas))
                                .filter(|t| !t.trim().is_empty())
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .filter(|t| !t.is_empty())
                        .collect();
                    if !cells.is_empty() {
                        all_text.push(cells.join(" "));
                    }
                }
            }
            _ => {}
        }
    }

    all_text.join("\n")
}

fn paragraph_content(paragraph: Node, include_formulas: bool) -> String {
    let mut parts = Vec::new();
    for child in elem_children(paragraph) {
        process_text_element(child, include_formulas, &mut parts);
    }
    parts.concat()
}

/// Recursive walk handling `mc:AlternateContent` by processing only the
/// `mc:Choice` branch.
fn process_text_element(node: Node, include_formulas: bool, parts: &mut Vec<String>) {
    match local(node) {
        "AlternateContent" => {
            if let Some(choice) = find_child(node, "Choice") {
                for child in elem_children(choice) {
                    process_text_element(child, include_formulas, parts);
                }
            }
        }
        "Fallback" => {}
        "r" => {
            for child in elem_children(node) {
                match local(child) {
                    "t" => {
                        if let Some(text) = child.text() {
                            parts.push(text.to_string());
                        }
                    }
                    "AlternateContent" => process_text_element(child, include_formulas, parts),
                    _ => {}
                }
            }
        }
        "oMath" => {
            if include_formulas {
                let latex = omml_to_latex(node);
                if !latex.trim().is_empty() {
                    parts.push(format!("${latex}$"));
                }
            }
        }
        "oMathPara" => {
            if include_formulas
                && let Some(omath) = find_child(node, "oMath")
            {
                let latex = omml_to_latex(omath);
                if !latex.trim().is_empty() {
                    parts.push(format!("$${latex}$$"));
                }
            }
        }
        _ => {
            for child in elem_children(node) {
                process_text_element(child, include_formulas, parts);
            }
        }
    }
}

fn extract_paragraphs(body: Node, styles: &HashMap<String, String>) -> Vec<DocxParagraph> {
    let mut paragraphs = Vec::new();

    // Direct children only; paragraphs nested in tables are covered by
    // the table extraction.
    for p in elem_children(body).filter(|n| local(*n) == "p") {
        let ppr = find_child(p, "pPr");
        let style_id = ppr.and_then(|ppr| find_child(ppr, "pStyle")).and_then(|s| w_attr(s, "val"));
        let alignment = ppr
            .and_then(|ppr| find_child(ppr, "jc"))
            .and_then(|jc| w_attr(jc, "val"))
            .map(str::to_string);
        let style = style_id.map(|id| styles.get(id).cloned().unwrap_or_else(|| id.to_string()));

        let mut runs = Vec::new();
        for r in p.descendants().filter(|n| n.is_element() && local(*n) == "r") {
            let text: String = r
                .descendants()
                .filter(|n| n.is_element() && local(*n) == "t")
                .filter_map(|n| n.text())
                .collect();
            if text.is_empty() {
                continue;
            }
            runs.push(parse_run_properties(r, text));
        }

        let text: String = runs.iter().map(|run| run.text.as_str()).collect();
        paragraphs.push(DocxParagraph {
            text,
            style,
            alignment,
            runs,
        });
    }
    paragraphs
}

fn parse_run_properties(r: Node, text: String) -> DocxRun {
    let mut run = DocxRun {
        text,
        ..Default::default()
    };
    let Some(rpr) = find_child(r, "rPr") else {
        return run;
    };

    if let Some(b) = find_child(rpr, "b") {
        run.bold = Some(w_attr(b, "val").map(|v| v != "0").unwrap_or(true));
    }
    if let Some(i) = find_child(rpr, "i") {
        run.italic = Some(w_attr(i, "val").map(|v| v != "0").unwrap_or(true));
    }
    if let Some(u) = find_child(rpr, "u") {
        run.underline = Some(w_attr(u, "val").map(|v| v != "none").unwrap_or(false));
    }
    if let Some(fonts) = find_child(rpr, "rFonts") {
        run.font_name = w_attr(fonts, "ascii")
            .or_else(|| w_attr(fonts, "hAnsi"))
            .or_else(|| w_attr(fonts, "cs"))
            .map(str::to_string);
    }
    if let Some(sz) = find_child(rpr, "sz") {
        // Half-points to points.
        run.font_size = w_attr(sz, "val").and_then(|v| v.parse::<f64>().ok()).map(|v| v / 2.0);
    }
    if let Some(color) = find_child(rpr, "color") {
        run.font_color = w_attr(color, "val").map(str::to_string);
    }
    run
}

fn extract_tables(body: Node) -> Vec<Table> {
    let mut tables = Vec::new();
    for tbl in body.descendants().filter(|n| n.is_element() && local(*n) == "tbl") {
        let mut rows = Vec::new();
        for tr in elem_children(tbl).filter(|n| local(*n) == "tr") {
            let row: Vec<String> = elem_children(tr)
                .filter(|n| local(*n) == "tc")
                .map(|tc| {
                    tc.descendants()
                        .filter(|n| n.is_element() && local(*n) == "p")
                        .map(subtree_text)
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .collect();
            rows.push(row);
        }
        tables.push(Table { rows });
    }
    tables
}

fn extract_sections(body: Node) -> Vec<Section> {
    let mut sect_prs = Vec::new();

    for p in body.descendants().filter(|n| n.is_element() && local(*n) == "p") {
        if let Some(sect_pr) = find_child(p, "pPr").and_then(|ppr| find_child(ppr, "sectPr")) {
            sect_prs.push(sect_pr);
        }
    }
    if let Some(final_sect) = find_child(body, "sectPr") {
        sect_prs.push(final_sect);
    }

    sect_prs
        .into_iter()
        .map(|sect_pr| {
            let mut section = Section::default();
            if let Some(pg_sz) = find_child(sect_pr, "pgSz") {
                section.page_width_inches = w_attr(pg_sz, "w").and_then(twips_to_inches);
                section.page_height_inches = w_attr(pg_sz, "h").and_then(twips_to_inches);
                // Portrait is the default and stays unset.
                if let Some(orient) = w_attr(pg_sz, "orient")
                    && orient != "portrait"
                {
                    section.orientation = Some(orient.to_string());
                }
            }
            if let Some(pg_mar) = find_child(sect_pr, "pgMar") {
                section.left_margin_inches = w_attr(pg_mar, "left").and_then(twips_to_inches);
                section.right_margin_inches = w_attr(pg_mar, "right").and_then(twips_to_inches);
                section.top_margin_inches = w_attr(pg_mar, "top").and_then(twips_to_inches);
                section.bottom_margin_inches = w_attr(pg_mar, "bottom").and_then(twips_to_inches);
            }
            section
        })
        .collect()
}

fn twips_to_inches(value: &str) -> Option<f64> {
    value.parse::<i64>().ok().map(|twips| twips as f64 / TWIPS_PER_INCH)
}

fn extract_hyperlinks(body: Node, rels: &[(String, String, String)]) -> Vec<Hyperlink> {
    let rel_map: HashMap<&str, (&str, &str)> = rels
        .iter()
        .map(|(id, rel_type, target)| (id.as_str(), (rel_type.as_str(), target.as_str())))
        .collect();

    body.descendants()
        .filter(|n| n.is_element() && local(*n) == "hyperlink")
        .filter_map(|link| {
            let r_id = link.attribute((R_NS, "id"))?;
            let (rel_type, target) = rel_map.get(r_id)?;
            if !rel_type.to_lowercase().contains("hyperlink") {
                return None;
            }
            Some(Hyperlink {
                text: subtree_text(link),
                url: target.to_string(),
            })
        })
        .collect()
}

fn extract_formulas(body: Node) -> Vec<Formula> {
    let mut formulas = Vec::new();
    let mut seen_inline: HashSet<roxmltree::NodeId> = HashSet::new();

    for omath_para in body
        .descendants()
        .filter(|n| n.is_element() && local(*n) == "oMathPara")
    {
        if let Some(omath) = find_child(omath_para, "oMath") {
            seen_inline.insert(omath.id());
            let latex = omml_to_latex(omath);
            if !latex.trim().is_empty() {
                formulas.push(Formula {
                    latex,
                    is_display: true,
                });
            }
        }
    }

    for omath in body.descendants().filter(|n| n.is_element() && local(*n) == "oMath") {
        if seen_inline.contains(&omath.id()) {
            continue;
        }
        let latex = omml_to_latex(omath);
        if !latex.trim().is_empty() {
            formulas.push(Formula {
                latex,
                is_display: false,
            });
        }
    }
    formulas
}

fn extract_headers_footers(
    ctx: &mut ZipContext<'_>,
    rels: &[(String, String, String)],
) -> (Vec<HeaderFooter>, Vec<HeaderFooter>) {
    let mut headers = Vec::new();
    let mut footers = Vec::new();

    for (_, rel_type, target) in rels {
        let type_lower = rel_type.to_lowercase();
        let is_header = type_lower.contains("header");
        let is_footer = type_lower.contains("footer");
        if !is_header && !is_footer {
            continue;
        }

        let part_path = format!("word/{target}");
        let Ok(xml) = ctx.read_xml(&part_path) else {
            continue;
        };
        let Ok(doc) = Document::parse(&xml) else {
            continue;
        };
        let text = subtree_text(doc.root_element());
        if text.is_empty() {
            continue;
        }

        let path_lower = part_path.to_lowercase();
        let kind = if path_lower.contains("first") || type_lower.contains("first") {
            "first_page"
        } else if path_lower.contains("even") || type_lower.contains("even") {
            "even_page"
        } else {
            "default"
        };

        let record = HeaderFooter {
            kind: kind.to_string(),
            text,
        };
        if is_header {
            headers.push(record);
        } else {
            footers.push(record);
        }
    }

    (headers, footers)
}

fn extract_images(
    ctx: &mut ZipContext<'_>,
    rels: &[(String, String, String)],
    body: Option<Node>,
) -> Vec<ImageRecord> {
    // rel id → (caption, description) gathered from document drawings.
    let mut drawing_metadata: HashMap<String, (String, String)> = HashMap::new();

    if let Some(body) = body {
        let paragraphs: Vec<Node> = elem_children(body).filter(|n| local(*n) == "p").collect();

        for (para_idx, para) in paragraphs.iter().enumerate() {
            for drawing in para
                .descendants()
                .filter(|n| n.is_element() && local(*n) == "drawing")
            {
                let mut caption = String::new();
                let mut description = String::new();

                if let Some(c_nv_pr) = drawing
                    .descendants()
                    .find(|n| n.is_element() && local(*n) == "cNvPr")
                {
                    description = c_nv_pr.attribute("descr").unwrap_or("").to_string();
                    caption = c_nv_pr.attribute("name").unwrap_or("").to_string();
                }

                // Text boxes grouped with the picture override the shape
                // name.
                for wsp in drawing.descendants().filter(|n| n.is_element() && local(*n) == "wsp") {
                    if let Some(txbx) = find_child(wsp, "txbx") {
                        let text = subtree_text(txbx);
                        if !text.is_empty() {
                            caption = text;
                            break;
                        }
                    }
                }

                // Preceding caption-styled paragraph with keepNext wins;
                // then a following caption-styled paragraph.
                let preceding = para_idx
                    .checked_sub(1)
                    .map(|i| paragraphs[i])
                    .filter(|prev| is_caption_style(paragraph_style(*prev)) && has_keep_next(*prev))
                    .map(subtree_text)
                    .filter(|t| !t.is_empty());
                let following = paragraphs
                    .get(para_idx + 1)
                    .filter(|next| is_caption_style(paragraph_style(**next)))
                    .map(|next| subtree_text(*next))
                    .filter(|t| !t.is_empty());

                if let Some(text) = preceding {
                    caption = text;
                } else if let Some(text) = following {
                    caption = text;
                }

                if let Some(blip) = drawing.descendants().find(|n| n.is_element() && local(*n) == "blip")
                    && let Some(embed) = blip.attribute((R_NS, "embed"))
                {
                    drawing_metadata.insert(embed.to_string(), (caption, description));
                }
            }
        }
    }

    let mut images = Vec::new();
    for (rel_id, rel_type, target) in rels {
        if !rel_type.to_lowercase().contains("image") {
            continue;
        }
        let image_path = format!("word/{target}");
        match ctx.read_bytes(&image_path) {
            Ok(payload) => {
                let (caption, description) = drawing_metadata.get(rel_id).cloned().unwrap_or_default();
                let (width, height) = probe_dimensions(&payload);
                images.push(ImageRecord {
                    image_index: (images.len() + 1) as u32,
                    unit_index: None,
                    name: target.rsplit('/').next().unwrap_or(target).to_string(),
                    content_type: image_mime_for_name(target).to_string(),
                    size_bytes: payload.len() as u64,
                    width,
                    height,
                    caption,
                    description,
                    data: Some(payload),
                    ..Default::default()
                });
            }
            Err(e) => {
                debug!("Image extraction failed for rel {rel_id}: {e}");
                images.push(ImageRecord {
                    image_index: (images.len() + 1) as u32,
                    name: target.rsplit('/').next().unwrap_or(target).to_string(),
                    error: Some(e.to_string()),
                    ..Default::default()
                });
            }
        }
    }
    images
}

fn paragraph_style<'a>(para: Node<'a, '_>) -> &'a str {
    find_child(para, "pPr")
        .and_then(|ppr| find_child(ppr, "pStyle"))
        .and_then(|style| w_attr(style, "val"))
        .unwrap_or("")
}

fn is_caption_style(style: &str) -> bool {
    let lower = style.to_lowercase();
    CAPTION_STYLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn has_keep_next(para: Node) -> bool {
    find_child(para, "pPr")
        .and_then(|ppr| find_child(ppr, "keepNext"))
        .map(|keep| {
            let val = w_attr(keep, "val").unwrap_or("true");
            !matches!(val.to_lowercase().as_str(), "false" | "0")
        })
        .unwrap_or(false)
}
