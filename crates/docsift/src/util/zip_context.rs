//! Reusable ZIP context for OOXML/ODF/EPUB decoding.
//!
//! Opens the archive once over in-memory bytes, runs the zip-bomb gate,
//! and caches the entry listing. XML parts are returned as owned strings;
//! callers parse them with `roxmltree` at the use site.

use crate::error::{DocsiftError, Result};
use crate::util::zip_bomb::{ZipBombLimits, validate_zip};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub struct ZipContext<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    names: HashSet<String>,
}

impl<'a> ZipContext<'a> {
    /// Open and validate an archive.
    pub fn open(data: &'a [u8], limits: &ZipBombLimits) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| DocsiftError::parsing(format!("Failed to open ZIP container: {e}")))?;
        validate_zip(&mut archive, limits)?;
        let names = archive.file_names().map(|n| n.to_string()).collect();
        Ok(ZipContext { archive, names })
    }

    /// Entry paths are stored without a leading slash; relationship
    /// targets that carry one are normalized here.
    fn normalize(path: &str) -> &str {
        path.strip_prefix('/').unwrap_or(path)
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.names.contains(Self::normalize(path))
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut entry = self
            .archive
            .by_name(Self::normalize(path))
            .map_err(|e| DocsiftError::parsing(format!("Missing archive entry '{path}': {e}")))?;
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|e| DocsiftError::parsing(format!("Failed to read archive entry '{path}': {e}")))?;
        Ok(buf)
    }

    /// Read an entry as UTF-8 text (with replacement).
    pub fn read_text(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read an XML part, stripping a BOM if present. The returned string
    /// is ready for `roxmltree::Document::parse`.
    pub fn read_xml(&mut self, path: &str) -> Result<String> {
        let text = self.read_text(path)?;
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options: FileOptions<()> = FileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_entry_listing_and_reads() {
        let data = build_zip(&[("word/document.xml", "<a/>"), ("media/img.png", "x")]);
        let mut ctx = ZipContext::open(&data, &ZipBombLimits::default()).unwrap();
        assert!(ctx.has_entry("word/document.xml"));
        assert!(ctx.has_entry("/word/document.xml"));
        assert!(!ctx.has_entry("missing.xml"));
        assert_eq!(ctx.read_text("word/document.xml").unwrap(), "<a/>");
        assert!(ctx.read_bytes("nope").is_err());
    }

    #[test]
    fn test_read_xml_strips_bom() {
        let data = build_zip(&[("content.xml", "\u{feff}<root/>")]);
        let mut ctx = ZipContext::open(&data, &ZipBombLimits::default()).unwrap();
        let xml = ctx.read_xml("content.xml").unwrap();
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }
}
