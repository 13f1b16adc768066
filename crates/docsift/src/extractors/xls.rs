//! Legacy XLS (BIFF) decoder.
//!
//! Cell data is parsed by `calamine`; every cell is projected to a
//! display string (dates as ISO-8601, whole numbers without decimals,
//! booleans as "True"/"False", errors as "#ERROR"). Metadata comes from
//! the compound-file summary stream, and embedded raster images are
//! pulled out of OfficeArt BLIP records on a best-effort basis.

use crate::error::{DocsiftError, Result};
use crate::types::{CellValue, ExtractedContent, ImageRecord, Sheet, XlsContent, XlsMetadata};
use crate::util::encryption::is_xls_encrypted;
use crate::util::image_size::probe_dimensions;
use crate::util::ole::{open_compound, read_stream, summary_information};
use calamine::{Data, Reader, Xls};
use std::io::Cursor;
use tracing::warn;

pub fn read_xls(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    if is_xls_encrypted(data) {
        return Err(DocsiftError::EncryptedFile("XLS file is encrypted".to_string()));
    }

    let mut workbook: Xls<_> = Xls::new(Cursor::new(data))
        .map_err(|e| DocsiftError::LegacyParse(format!("Failed to parse XLS workbook: {e}")))?;

    let sheet_names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let rows: Vec<Vec<String>> = match workbook.worksheet_range(name) {
            Ok(range) => range
                .rows()
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect(),
            Err(e) => {
                warn!("Failed to read sheet '{name}': {e}");
                Vec::new()
            }
        };
        sheets.push(build_sheet(name, rows));
    }

    let mut metadata = read_xls_metadata(data);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    let images = extract_blip_images(data);

    let full_text = sheets
        .iter()
        .map(|sheet| sheet.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(vec![ExtractedContent::Xls(XlsContent {
        metadata,
        sheets,
        images,
        full_text,
    })])
}

/// Project any BIFF cell onto its display string.
fn cell_to_string(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => {
            if *b {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => {
                let time = datetime.format("%H:%M:%S").to_string();
                if time == "00:00:00" {
                    datetime.format("%Y-%m-%d").to_string()
                } else {
                    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => "#ERROR".to_string(),
    }
}

fn build_sheet(name: &str, rows: Vec<Vec<String>>) -> Sheet {
    let (headers, data_rows) = match rows.split_first() {
        Some((header_row, rest)) => {
            let headers: Vec<String> = header_row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if cell.trim().is_empty() {
                        format!("col_{i}")
                    } else {
                        cell.clone()
                    }
                })
                .collect();
            (headers, rest.to_vec())
        }
        None => (Vec::new(), Vec::new()),
    };

    let text = format_sheet_as_text(&headers, &data_rows);

    Sheet {
        name: name.to_string(),
        headers,
        rows: data_rows
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::Str).collect())
            .collect(),
        text,
    }
}

/// Right-aligned text table with two-space column separation.
fn format_sheet_as_text(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut all_rows: Vec<&[String]> = Vec::with_capacity(rows.len() + 1);
    if !headers.is_empty() {
        all_rows.push(headers);
    }
    all_rows.extend(rows.iter().map(Vec::as_slice));
    if all_rows.is_empty() {
        return String::new();
    }

    let num_cols = all_rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; num_cols];
    for row in &all_rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    all_rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:>width$}", width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_xls_metadata(data: &[u8]) -> XlsMetadata {
    let Ok(mut comp) = open_compound(data) else {
        return XlsMetadata::default();
    };
    let summary = summary_information(&mut comp);
    let doc_summary = crate::util::ole::document_summary_information(&mut comp);

    XlsMetadata {
        title: summary.string(2),
        subject: summary.string(3),
        author: summary.string(4),
        last_saved_by: summary.string(8),
        created: summary.string(12),
        modified: summary.string(13),
        company: doc_summary.string(15),
        ..Default::default()
    }
}

// --- OfficeArt BLIP scan ----------------------------------------------------

/// BLIP record types with their payload skip (UID bytes, optional tag
/// byte) and nominal content type. EMF/WMF payloads are
/// deflate-compressed inside the record; those yield an empty payload.
const BLIP_PNG: u16 = 0xF01E;
const BLIP_JPEG: u16 = 0xF01D;
const BLIP_JPEG_CMYK: u16 = 0xF02A;
const BLIP_DIB: u16 = 0xF020;
const BLIP_EMF: u16 = 0xF01A;
const BLIP_WMF: u16 = 0xF01B;

/// Scan the raw Workbook stream for OfficeArt BLIP records. This is
/// best-effort: unrecognized or truncated records are skipped.
fn extract_blip_images(data: &[u8]) -> Vec<ImageRecord> {
    let Ok(mut comp) = open_compound(data) else {
        return Vec::new();
    };
    let stream = match read_stream(&mut comp, "/Workbook").or_else(|_| read_stream(&mut comp, "/Book")) {
        Ok(stream) => stream,
        Err(_) => return Vec::new(),
    };

    let mut images = Vec::new();
    let mut pos = 0usize;

    while pos + 8 <= stream.len() {
        let ver_instance = u16::from_le_bytes([stream[pos], stream[pos + 1]]);
        let record_type = u16::from_le_bytes([stream[pos + 2], stream[pos + 3]]);
        let record_len =
            u32::from_le_bytes([stream[pos + 4], stream[pos + 5], stream[pos + 6], stream[pos + 7]]) as usize;

        let (content_type, has_tag_byte, lossless) = match record_type {
            BLIP_PNG => ("image/png", true, true),
            BLIP_JPEG | BLIP_JPEG_CMYK => ("image/jpeg", true, true),
            BLIP_DIB => ("image/bmp", true, true),
            BLIP_EMF => ("image/x-emf", false, false),
            BLIP_WMF => ("image/x-wmf", false, false),
            _ => {
                pos += 1;
                continue;
            }
        };

        let content_start = pos + 8;
        let Some(content_end) = content_start.checked_add(record_len).filter(|&e| e <= stream.len()) else {
            pos += 1;
            continue;
        };

        // The instance low bit selects one or two 16-byte UIDs before
        // the pixel data.
        let instance = ver_instance >> 4;
        let uid_len = if instance & 0x1 == 1 { 32 } else { 16 };
        let skip = uid_len + usize::from(has_tag_byte);
        if content_start + skip > content_end {
            pos += 1;
            continue;
        }
        let payload = &stream[content_start + skip..content_end];

        // Reject scans that landed on random bytes: lossless payloads
        // must carry a recognizable header.
        let (width, height) = probe_dimensions(payload);
        if lossless && width.is_none() {
            pos += 1;
            continue;
        }

        images.push(ImageRecord {
            image_index: (images.len() + 1) as u32,
            unit_index: None,
            name: format!("blip{}", images.len() + 1),
            content_type: content_type.to_string(),
            size_bytes: payload.len() as u64,
            width,
            height,
            data: if lossless { Some(payload.to_vec()) } else { Some(Vec::new()) },
            ..Default::default()
        });
        pos = content_end;
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("x".into())), "x");
        assert_eq!(cell_to_string(&Data::Float(30.0)), "30");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Bool(true)), "True");
        assert_eq!(cell_to_string(&Data::Bool(false)), "False");
    }

    #[test]
    fn test_headers_with_col_fallback() {
        let rows = vec![
            vec!["Name".to_string(), String::new(), "City".to_string()],
            vec!["John".to_string(), "30".to_string(), "NYC".to_string()],
        ];
        let sheet = build_sheet("S1", rows);
        assert_eq!(sheet.headers, vec!["Name", "col_1", "City"]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0][0], CellValue::Str("John".to_string()));
    }

    #[test]
    fn test_text_table_two_space_separator() {
        let headers = vec!["Name".to_string(), "Age".to_string()];
        let rows = vec![vec!["John".to_string(), "30".to_string()]];
        let text = format_sheet_as_text(&headers, &rows);
        assert_eq!(text, "Name  Age\nJohn   30");
    }

    #[test]
    fn test_blip_scan_finds_png() {
        // A compound file whose Workbook stream holds one OfficeArt PNG
        // BLIP record.
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&13u32.to_be_bytes());
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&8u32.to_be_bytes());
        png.extend_from_slice(&4u32.to_be_bytes());
        png.extend_from_slice(&[0u8; 5]);

        let mut record = Vec::new();
        let instance: u16 = 0x6E0;
        record.extend_from_slice(&((instance << 4) as u16).to_le_bytes());
        record.extend_from_slice(&BLIP_PNG.to_le_bytes());
        record.extend_from_slice(&((16 + 1 + png.len()) as u32).to_le_bytes());
        record.extend_from_slice(&[0u8; 16]); // UID
        record.push(0xFF); // tag
        record.extend_from_slice(&png);

        let mut stream = vec![0u8; 32];
        stream.extend_from_slice(&record);

        let cursor = std::io::Cursor::new(Vec::new());
        let mut comp = cfb::CompoundFile::create(cursor).unwrap();
        use std::io::Write;
        comp.create_stream("/Workbook").unwrap().write_all(&stream).unwrap();
        comp.flush().unwrap();
        let data = comp.into_inner().into_inner();

        let images = extract_blip_images(&data);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].content_type, "image/png");
        assert_eq!(images[0].width, Some(8));
        assert_eq!(images[0].height, Some(4));
        assert!(!images[0].data.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_encrypted_xls_rejected() {
        use std::io::Write;
        let mut workbook = Vec::new();
        workbook.extend_from_slice(&[0x09, 0x08, 0x04, 0x00, 0, 0, 0, 0]);
        workbook.extend_from_slice(&[0x2F, 0x00, 0x02, 0x00, 0, 0]);
        let cursor = std::io::Cursor::new(Vec::new());
        let mut comp = cfb::CompoundFile::create(cursor).unwrap();
        comp.create_stream("/Workbook").unwrap().write_all(&workbook).unwrap();
        comp.flush().unwrap();
        let data = comp.into_inner().into_inner();
        assert!(matches!(read_xls(&data, None), Err(DocsiftError::EncryptedFile(_))));
    }
}
