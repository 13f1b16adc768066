//! Content model for spreadsheets, legacy and modern.

use super::{Content, FileMetadata, ImageRecord, Unit, UnitKind};

/// A typed spreadsheet cell value.
///
/// Dates and datetimes are projected to ISO-8601 strings at extraction
/// time; whole-number floats become integers. Legacy XLS cells are always
/// the `Str` variant (including "True"/"False" and "#ERROR").
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Display form used by the fixed-width sheet rendering.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Str(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => {
                if *b {
                    "True".to_string()
                } else {
                    "False".to_string()
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// One worksheet: headers, data rows aligned to the headers, and the
/// fixed-width text rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub text: String,
}

impl Sheet {
    /// Rows projected as (header, value) records.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &CellValue)>> {
        self.rows
            .iter()
            .map(|row| self.headers.iter().map(String::as_str).zip(row.iter()).collect())
    }
}

/// Metadata of a legacy XLS file, from the compound-file summary stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XlsMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub company: String,
    pub last_saved_by: String,
    pub created: String,
    pub modified: String,
}

/// Extracted content of a legacy XLS workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XlsContent {
    pub metadata: XlsMetadata,
    pub sheets: Vec<Sheet>,
    pub images: Vec<ImageRecord>,
    pub full_text: String,
}

impl Content for XlsContent {
    fn units(&self) -> Vec<Unit> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(i, sheet)| Unit {
                number: (i + 1) as u32,
                kind: UnitKind::Sheet,
                text: sheet.text.clone(),
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
        "XlsContent"
    }
}

/// Metadata of an XLSX file, from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XlsxMetadata {
    pub file: FileMetadata,
    pub title: String,
    pub description: String,
    pub creator: String,
    pub last_modified_by: String,
    pub created: String,
    pub modified: String,
    pub keywords: String,
    pub language: String,
    pub revision: String,
}

/// Extracted content of an XLSX workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XlsxContent {
    pub metadata: XlsxMetadata,
    pub sheets: Vec<Sheet>,
    pub images: Vec<ImageRecord>,
}

impl Content for XlsxContent {
    fn units(&self) -> Vec<Unit> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(i, sheet)| Unit {
                number: (i + 1) as u32,
                kind: UnitKind::Sheet,
                text: format!("{}\n{}", sheet.name, sheet.text.trim()),
            })
            .collect()
    }

    fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "XlsxContent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Empty.display(), "");
        assert_eq!(CellValue::Int(42).display(), "42");
        assert_eq!(CellValue::Float(1.5).display(), "1.5");
        assert_eq!(CellValue::Bool(true).display(), "True");
        assert_eq!(CellValue::Str("x".into()).display(), "x");
    }

    #[test]
    fn test_sheet_records_align_headers() {
        let sheet = Sheet {
            name: "S".into(),
            headers: vec!["Name".into(), "Age".into()],
            rows: vec![vec![CellValue::Str("Alice".into()), CellValue::Int(30)]],
            text: String::new(),
        };
        let records: Vec<_> = sheet.records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0][0], ("Name", &CellValue::Str("Alice".into())));
        assert_eq!(records[0][1], ("Age", &CellValue::Int(30)));
    }
}
