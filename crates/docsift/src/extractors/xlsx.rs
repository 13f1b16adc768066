//! XLSX decoder.
//!
//! Cell data comes from `calamine` in values-only mode (formulas yield
//! their cached results). Embedded images are resolved by walking the
//! package ZIP directly: worksheet rels name the drawing part, the
//! drawing's own rels map `r:embed` ids to `xl/media/` payloads.

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use crate::mime::image_mime_for_name;
use crate::types::{CellValue, ExtractedContent, ImageRecord, Sheet, XlsxContent, XlsxMetadata};
use crate::util::encryption::is_ooxml_encrypted;
use crate::util::zip_context::ZipContext;
use calamine::{Data, Reader, Xlsx};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, warn};

const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// DrawingML lengths are EMU-denominated; 9525 EMU per pixel at 96 dpi.
const EMU_PER_PIXEL: i64 = 9525;

pub fn read_xlsx(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    if is_ooxml_encrypted(data) {
        return Err(DocsiftError::EncryptedFile("XLSX file is encrypted".to_string()));
    }

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse XLSX workbook: {e}")))?;

    let sheet_names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let rows: Vec<Vec<CellValue>> = match workbook.worksheet_range(name) {
            Ok(range) => range
                .rows()
                .map(|row| row.iter().map(convert_cell).collect())
                .collect(),
            Err(e) => {
                warn!("Failed to read sheet '{name}': {e}");
                Vec::new()
            }
        };
        sheets.push(build_sheet(name, rows));
    }

    let mut metadata = read_metadata(data);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    let images = extract_images(data, sheet_names.len());

    Ok(vec![ExtractedContent::Xlsx(XlsxContent {
        metadata,
        sheets,
        images,
    })])
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Str(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => {
            // Whole-number floats project to integers.
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                CellValue::Int(*f as i64)
            } else {
                CellValue::Float(*f)
            }
        }
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Str(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Str(dt.as_f64().to_string()),
        },
        Data::DateTimeIso(s) => CellValue::Str(s.clone()),
        Data::DurationIso(s) => CellValue::Str(s.clone()),
        Data::Error(_) => CellValue::Str("#ERROR".to_string()),
    }
}

/// Trim trailing empties, pick headers, and render the text table.
pub(crate) fn build_sheet(name: &str, mut rows: Vec<Vec<CellValue>>) -> Sheet {
    trim_trailing(&mut rows);

    if rows.is_empty() {
        return Sheet {
            name: name.to_string(),
            ..Default::default()
        };
    }

    // An initial "table name" row (exactly one meaningful cell) is not
    // part of the structured projection.
    let data_start = usize::from(is_table_name_row(&rows[0]));
    let structured = &rows[data_start..];

    let (headers, records) = match structured.split_first() {
        Some((header_row, data_rows)) => {
            let headers: Vec<String> = header_row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if cell.is_empty() {
                        format!("Unnamed: {i}")
                    } else {
                        cell.display()
                    }
                })
                .collect();
            (headers, data_rows.to_vec())
        }
        None => (Vec::new(), Vec::new()),
    };

    let text = format_sheet_as_text(&rows);

    Sheet {
        name: name.to_string(),
        headers,
        rows: records,
        text,
    }
}

fn trim_trailing(rows: &mut Vec<Vec<CellValue>>) {
    // Trailing empty rows.
    let last_row = rows
        .iter()
        .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
        .map(|i| i + 1)
        .unwrap_or(0);
    rows.truncate(last_row);

    // Trailing columns beyond the rightmost non-empty cell anywhere.
    let last_col = rows
        .iter()
        .filter_map(|row| row.iter().rposition(|cell| !cell.is_empty()).map(|i| i + 1))
        .max()
        .unwrap_or(0);
    for row in rows.iter_mut() {
        row.truncate(last_col);
    }
}

fn is_table_name_row(row: &[CellValue]) -> bool {
    row.len() > 1 && row.iter().filter(|cell| !cell.is_empty()).count() == 1
}

/// Fixed-width table: right-aligned columns separated by one space.
pub(crate) fn format_sheet_as_text(rows: &[Vec<CellValue>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let num_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; num_cols];
    let mut rendered: Vec<Vec<String>> = Vec::with_capacity(rows.len());

    for row in rows {
        let mut cells = Vec::with_capacity(num_cols);
        for i in 0..num_cols {
            let display = row.get(i).map(CellValue::display).unwrap_or_default();
            widths[i] = widths[i].max(display.chars().count());
            cells.push(display);
        }
        rendered.push(cells);
    }

    rendered
        .iter()
        .map(|cells| {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:>width$}", width = widths[i]))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_metadata(data: &[u8]) -> XlsxMetadata {
    let mut metadata = XlsxMetadata::default();
    let limits = ExtractionLimits::default();
    let Ok(mut ctx) = ZipContext::open(data, &limits.zip_bomb) else {
        return metadata;
    };
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
            "description" => metadata.description = text,
            "creator" => metadata.creator = text,
            "lastModifiedBy" => metadata.last_modified_by = text,
            "created" => metadata.created = text,
            "modified" => metadata.modified = text,
            "keywords" => metadata.keywords = text,
            "language" => metadata.language = text,
            "revision" => metadata.revision = text,
            _ => {}
        }
    }
    metadata
}

// --- image extraction over the raw package ----------------------------------

fn extract_images(data: &[u8], sheet_count: usize) -> Vec<ImageRecord> {
    let limits = ExtractionLimits::default();
    let mut ctx = match ZipContext::open(data, &limits.zip_bomb) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!("Failed to reopen XLSX package for images: {e}");
            return Vec::new();
        }
    };

    let mut images = Vec::new();

    for sheet_idx in 0..sheet_count {
        let rels_path = format!("xl/worksheets/_rels/sheet{}.xml.rels", sheet_idx + 1);
        let Ok(rels_xml) = ctx.read_xml(&rels_path) else {
            continue;
        };
        let Some(drawing_path) = drawing_target(&rels_xml) else {
            continue;
        };
        if !ctx.has_entry(&drawing_path) {
            continue;
        }

        // The drawing's own rels map r:embed ids to media paths.
        let drawing_rels_path = drawing_path
            .replace("drawings/", "drawings/_rels/")
            .replace(".xml", ".xml.rels");
        let rid_to_image: HashMap<String, String> = ctx
            .read_xml(&drawing_rels_path)
            .ok()
            .map(|xml| image_targets(&xml))
            .unwrap_or_default();

        let Ok(drawing_xml) = ctx.read_xml(&drawing_path) else {
            continue;
        };
        let Ok(drawing) = Document::parse(&drawing_xml) else {
            continue;
        };

        for anchor in drawing.descendants().filter(|n| {
            n.is_element()
                && matches!(
                    n.tag_name().name(),
                    "oneCellAnchor" | "twoCellAnchor" | "absoluteAnchor"
                )
        }) {
            let Some(pic) = child_named(anchor, "pic") else {
                continue;
            };

            let (width, height) = anchor_extent(anchor);
            let (caption, description) = pic_non_visual_props(pic);

            let Some(embed) = child_named(pic, "blipFill")
                .and_then(|fill| child_named(fill, "blip"))
                .and_then(|blip| blip.attribute((R_NS, "embed")))
            else {
                continue;
            };
            let Some(image_path) = rid_to_image.get(embed) else {
                continue;
            };

            match ctx.read_bytes(image_path) {
                Ok(payload) => {
                    let filename = image_path.rsplit('/').next().unwrap_or(image_path).to_string();
                    images.push(ImageRecord {
                        image_index: (images.len() + 1) as u32,
                        unit_index: Some((sheet_idx + 1) as u32),
                        content_type: image_mime_for_name(&filename).to_string(),
                        name: filename,
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
                    debug!("Failed to read drawing image '{image_path}': {e}");
                }
            }
        }
    }

    images
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn anchor_extent(anchor: Node) -> (Option<u32>, Option<u32>) {
    let Some(ext) = child_named(anchor, "ext") else {
        return (None, None);
    };
    let to_pixels = |attr: &str| {
        ext.attribute(attr)
            .and_then(|v| v.parse::<i64>().ok())
            .map(|emu| (emu / EMU_PER_PIXEL) as u32)
    };
    (to_pixels("cx"), to_pixels("cy"))
}

fn pic_non_visual_props(pic: Node) -> (String, String) {
    let Some(c_nv_pr) = child_named(pic, "nvPicPr").and_then(|nv| child_named(nv, "cNvPr")) else {
        return (String::new(), String::new());
    };
    (
        c_nv_pr.attribute("name").unwrap_or("").to_string(),
        c_nv_pr.attribute("descr").unwrap_or("").to_string(),
    )
}

/// The drawing part referenced by a worksheet rels document, normalized
/// to an archive path.
fn drawing_target(rels_xml: &str) -> Option<String> {
    let doc = Document::parse(rels_xml).ok()?;
    for rel in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
    {
        let rel_type = rel.attribute("Type").unwrap_or("");
        if !rel_type.contains("drawing") {
            continue;
        }
        let target = rel.attribute("Target").unwrap_or("");
        let normalized = if let Some(absolute) = target.strip_prefix('/') {
            absolute.to_string()
        } else if let Some(relative) = target.strip_prefix("../") {
            format!("xl/{relative}")
        } else {
            format!("xl/worksheets/{target}")
        };
        return Some(normalized);
    }
    None
}

fn image_targets(rels_xml: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(doc) = Document::parse(rels_xml) else {
        return map;
    };
    for rel in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
    {
        let rel_type = rel.attribute("Type").unwrap_or("");
        if !rel_type.contains("image") {
            continue;
        }
        let id = rel.attribute("Id").unwrap_or("").to_string();
        let target = rel.attribute("Target").unwrap_or("");
        let path = if let Some(absolute) = target.strip_prefix('/') {
            absolute.to_string()
        } else {
            format!("xl/media/{}", target.rsplit('/').next().unwrap_or(target))
        };
        map.insert(id, path);
    }
    map
}
