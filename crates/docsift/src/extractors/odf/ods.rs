//! ODS (OpenDocument Spreadsheet) decoder.

use super::{AttrByLocalName, child_named, descendants_named, load_image, open_odf, read_odf_metadata, text_recursive};
use crate::error::{DocsiftError, Result};
use crate::types::{CellValue, ExtractedContent, ImageRecord, OdsContent, Sheet};
use crate::util::zip_context::ZipContext;
use roxmltree::{Document, Node};
use tracing::debug;

/// Repetition counts above this are collapsed when the repeated cell is
/// empty, so huge blank regions never materialize.
const REPEAT_CAP: usize = 100;

pub fn read_ods(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let mut ctx = open_odf(data, "ODS")?;

    let content_xml = ctx.read_xml("content.xml")?;
    let doc = Document::parse(&content_xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse content.xml: {e}")))?;

    let mut metadata = read_odf_metadata(&mut ctx);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    let body_tables: Vec<Node> = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "table")
        .collect();

    let mut sheets = Vec::with_capacity(body_tables.len());
    let mut images = Vec::new();
    for (idx, table) in body_tables.iter().enumerate() {
        sheets.push(extract_sheet(&mut ctx, *table, (idx + 1) as u32, &mut images));
    }

    Ok(vec![ExtractedContent::Ods(OdsContent {
        metadata,
        sheets,
        images,
    })])
}

/// Typed value of one cell, from `office:value-type`.
fn cell_value(cell: Node) -> CellValue {
    match cell.attribute_ns_any("value-type").unwrap_or("") {
        "float" | "currency" | "percentage" => {
            let Some(raw) = cell.attribute_ns_any("value") else {
                return CellValue::Empty;
            };
            match raw.parse::<f64>() {
                Ok(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => CellValue::Int(value as i64),
                Ok(value) => CellValue::Float(value),
                Err(_) => CellValue::Str(raw.to_string()),
            }
        }
        "date" => match cell.attribute_ns_any("date-value") {
            Some(value) => CellValue::Str(value.to_string()),
            None => CellValue::Empty,
        },
        "time" => match cell.attribute_ns_any("time-value") {
            Some(value) => CellValue::Str(value.to_string()),
            None => CellValue::Empty,
        },
        "boolean" => match cell.attribute_ns_any("boolean-value") {
            Some(value) => CellValue::Bool(value.eq_ignore_ascii_case("true")),
            None => CellValue::Empty,
        },
        _ => {
            let text = descendants_named(cell, "p")
                .map(text_recursive)
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Str(text)
            }
        }
    }
}

/// Excel-style column letters (A…Z, AA…).
fn column_name(index: usize) -> String {
    let mut result = String::new();
    let mut index = index as i64;
    while index >= 0 {
        result.insert(0, (b'A' + (index % 26) as u8) as char);
        index = index / 26 - 1;
    }
    result
}

fn extract_sheet(
    ctx: &mut ZipContext<'_>,
    table: Node,
    sheet_number: u32,
    all_images: &mut Vec<ImageRecord>,
) -> Sheet {
    let name = table.attribute_ns_any("name").unwrap_or("").to_string();

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for row in table
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "table-row")
    {
        let row_repeat: usize = row
            .attribute_ns_any("number-rows-repeated")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        let mut values: Vec<CellValue> = Vec::new();
        for cell in row
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "table-cell")
        {
            let cell_repeat: usize = cell
                .attribute_ns_any("number-columns-repeated")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            let value = cell_value(cell);

            // Only empty cells get collapsed; a repeated value always
            // expands in full.
            if value.is_empty() && cell_repeat > REPEAT_CAP {
                // One placeholder keeps the column position.
                values.push(CellValue::Empty);
            } else {
                for _ in 0..cell_repeat {
                    values.push(value.clone());
                }
            }
        }

        let row_is_empty = values.iter().all(CellValue::is_empty);
        if row_repeat > REPEAT_CAP && row_is_empty {
            debug!("Collapsing {row_repeat} repeated empty rows in sheet '{name}'");
            rows.push(values);
        } else {
            for _ in 0..row_repeat {
                rows.push(values.clone());
            }
        }
    }

    // Trim trailing empty rows and columns.
    let last_row = rows
        .iter()
        .rposition(|row| row.iter().any(|v| !v.is_empty()))
        .map(|i| i + 1)
        .unwrap_or(0);
    rows.truncate(last_row);

    let last_col = rows
        .iter()
        .filter_map(|row| row.iter().rposition(|v| !v.is_empty()).map(|i| i + 1))
        .max()
        .unwrap_or(0);
    for row in rows.iter_mut() {
        row.truncate(last_col);
        row.resize(last_col, CellValue::Empty);
    }

    let headers: Vec<String> = (0..last_col).map(column_name).collect();

    let text = rows
        .iter()
        .filter_map(|row| {
            let cells: Vec<String> = row.iter().filter(|v| !v.is_empty()).map(CellValue::display).collect();
            if cells.is_empty() {
                None
            } else {
                Some(cells.join("\t"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    for frame in descendants_named(table, "frame") {
        if let Some(image_elem) = child_named(frame, "image")
            && let Some(href) = image_elem.attribute_ns_any("href")
            && !href.is_empty()
            && !href.starts_with("http")
            && ctx.has_entry(href)
        {
            let caption = child_named(frame, "title")
                .and_then(|n| n.text())
                .unwrap_or("")
                .to_string();
            let description = child_named(frame, "desc")
                .and_then(|n| n.text())
                .unwrap_or("")
                .to_string();
            let display_name = frame
                .attribute_ns_any("name")
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| href.rsplit('/').next().unwrap_or(href));
            let index = (all_images.len() + 1) as u32;
            all_images.push(load_image(
                ctx,
                href,
                display_name,
                index,
                Some(sheet_number),
                caption,
                description,
            ));
        }
    }

    Sheet {
        name,
        headers,
        rows,
        text,
    }
}
