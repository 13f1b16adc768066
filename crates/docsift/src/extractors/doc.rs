//! Legacy DOC (Word 97-2003) decoder.
//!
//! Reads the `WordDocument` stream out of the OLE container, validates
//! the FIB magic, and pulls the text regions (main body, footnotes,
//! headers/footers, annotations) which are stored contiguously from a
//! scan-detected start offset. Region lengths come from the FIB `ccp`
//! character counts.

use crate::error::{DocsiftError, Result};
use crate::types::{DocContent, DocMetadata, ExtractedContent};
use crate::util::encoding::{decode_cp1252, decode_utf16le};
use crate::util::ole::{document_summary_information, open_compound, read_stream, summary_information};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// FIB offsets (MS-DOC).
const OFF_MAGIC: usize = 0x00;
const OFF_FLAGS: usize = 0x0A;
const OFF_CCP_TEXT: usize = 0x4C;
const OFF_CCP_FTN: usize = 0x50;
const OFF_CCP_HDD: usize = 0x54;
const OFF_CCP_ATN: usize = 0x5C;

const DOC_MAGIC: u16 = 0xA5EC;
/// fEncrypted bit in the FIB flags word.
const FLAG_ENCRYPTED: u16 = 0x0100;

static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static MULTI_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf16Le,
    Cp1252,
}

impl TextEncoding {
    fn bytes_per_char(self) -> usize {
        match self {
            TextEncoding::Utf16Le => 2,
            TextEncoding::Cp1252 => 1,
        }
    }
}

pub fn read_doc(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let mut comp = open_compound(data)?;

    let word_doc = read_stream(&mut comp, "/WordDocument")?;
    if word_doc.len() < 0x60 {
        return Err(DocsiftError::LegacyParse("WordDocument stream too short".to_string()));
    }

    let magic = u16::from_le_bytes([word_doc[OFF_MAGIC], word_doc[OFF_MAGIC + 1]]);
    if magic != DOC_MAGIC {
        return Err(DocsiftError::LegacyParse(format!(
            "Invalid DOC magic number: 0x{magic:04X}, expected 0xA5EC"
        )));
    }

    let flags = u16::from_le_bytes([word_doc[OFF_FLAGS], word_doc[OFF_FLAGS + 1]]);
    if flags & FLAG_ENCRYPTED != 0 {
        return Err(DocsiftError::EncryptedFile("DOC file is encrypted".to_string()));
    }

    let ccp_text = read_u32(&word_doc, OFF_CCP_TEXT) as usize;
    let ccp_ftn = read_u32(&word_doc, OFF_CCP_FTN) as usize;
    let ccp_hdd = read_u32(&word_doc, OFF_CCP_HDD) as usize;
    let ccp_atn = read_u32(&word_doc, OFF_CCP_ATN) as usize;

    let (text_start, encoding) = find_text_start_and_encoding(&word_doc);
    debug!("DOC text start 0x{text_start:X}, encoding {encoding:?}");

    let mut offset = text_start;
    let mut read_region = |count: usize| -> String {
        let byte_len = count.saturating_mul(encoding.bytes_per_char());
        let end = offset.saturating_add(byte_len).min(word_doc.len());
        if offset >= end {
            return String::new();
        }
        let raw = &word_doc[offset..end];
        offset = end;
        let decoded = match encoding {
            TextEncoding::Utf16Le => decode_utf16le(raw),
            TextEncoding::Cp1252 => decode_cp1252(raw),
        };
        clean_doc_text(&decoded)
    };

    let main_text = read_region(ccp_text);
    let footnotes = read_region(ccp_ftn);
    let headers_footers = read_region(ccp_hdd);
    let annotations = read_region(ccp_atn);

    let mut metadata = read_doc_metadata(&mut comp);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    Ok(vec![ExtractedContent::Doc(DocContent {
        metadata,
        main_text,
        footnotes,
        headers_footers,
        annotations,
    })])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    if offset + 4 > data.len() {
        return 0;
    }
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Scan candidate offsets in [0x200, 0x2000) on a 0x40 grid, scoring a
/// 64-byte window for UTF-16LE (>= 20 plausible pairs) or CP-1252
/// (>= 45 plausible bytes). The first offset over a threshold wins;
/// with no hit the legacy default of 0x800/CP-1252 applies.
fn find_text_start_and_encoding(word_doc: &[u8]) -> (usize, TextEncoding) {
    const WINDOW: usize = 64;
    const UTF16_THRESHOLD: usize = 20;
    const CP1252_THRESHOLD: usize = 45;

    let mut candidate = 0x200;
    while candidate < 0x2000 {
        if candidate + WINDOW > word_doc.len() {
            break;
        }
        let window = &word_doc[candidate..candidate + WINDOW];

        let utf16_pairs = window
            .chunks_exact(2)
            .filter(|pair| is_plausible_utf16_pair(pair[0], pair[1]))
            .count();
        if utf16_pairs >= UTF16_THRESHOLD {
            return (candidate, TextEncoding::Utf16Le);
        }

        let cp1252_bytes = window.iter().filter(|&&b| is_plausible_cp1252_byte(b)).count();
        if cp1252_bytes >= CP1252_THRESHOLD {
            return (candidate, TextEncoding::Cp1252);
        }

        candidate += 0x40;
    }

    (0x800, TextEncoding::Cp1252)
}

/// ASCII text or a common Latin-1 accented letter, followed by a NUL.
fn is_plausible_utf16_pair(low: u8, high: u8) -> bool {
    if high != 0 {
        return false;
    }
    matches!(low, 0x20..=0x7E | 0x09 | 0x0A | 0x0D | 0x0B | 0x0C | 0xC0..=0xFF)
}

fn is_plausible_cp1252_byte(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7E | 0x09 | 0x0A | 0x0D | 0x0B | 0x0C | 0xA0..=0xFF)
}

/// Map Word's control bytes to plain text and normalize whitespace.
fn clean_doc_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{7}' => out.push('\t'),   // cell mark
            '\u{b}' => out.push('\n'),   // vertical tab
            '\u{c}' => out.push_str("\n\n"), // page break
            '\r' => out.push('\n'),
            '\u{13}' | '\u{14}' | '\u{15}' => {} // field markers
            '\n' | '\t' => out.push(ch),
            ch if (ch as u32) < 0x20 => {}
            ch => out.push(ch),
        }
    }
    let out = MULTI_SPACE_RE.replace_all(&out, " ");
    MULTI_NEWLINE_RE.replace_all(&out, "\n\n").trim().to_string()
}

fn read_doc_metadata<F: std::io::Read + std::io::Seek>(comp: &mut cfb::CompoundFile<F>) -> DocMetadata {
    let summary = summary_information(comp);
    let _doc_summary = document_summary_information(comp);

    DocMetadata {
        title: summary.string(2),
        subject: summary.string(3),
        author: summary.string(4),
        keywords: summary.string(5),
        last_saved_by: summary.string(8),
        create_time: summary.string(12),
        last_saved_time: summary.string(13),
        num_pages: summary.u32(14),
        num_words: summary.u32(15),
        num_chars: summary.u32(16),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use std::io::{Cursor, Write};

    /// Build a minimal WordDocument stream: FIB header, text at 0x800 in
    /// the chosen encoding.
    fn build_word_doc(text: &str, utf16: bool, ccp_ftn: u32, footnote_text: &str) -> Vec<u8> {
        let mut stream = vec![0u8; 0x800];
        stream[0] = 0xEC;
        stream[1] = 0xA5;

        let body: Vec<u8> = if utf16 {
            text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
        } else {
            text.bytes().collect()
        };
        let footnotes: Vec<u8> = if utf16 {
            footnote_text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
        } else {
            footnote_text.bytes().collect()
        };

        stream[OFF_CCP_TEXT..OFF_CCP_TEXT + 4].copy_from_slice(&(text.chars().count() as u32).to_le_bytes());
        stream[OFF_CCP_FTN..OFF_CCP_FTN + 4].copy_from_slice(&ccp_ftn.to_le_bytes());

        stream.extend_from_slice(&body);
        stream.extend_from_slice(&footnotes);
        stream
    }

    fn build_doc_file(word_doc: &[u8]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut comp = cfb::CompoundFile::create(cursor).unwrap();
        comp.create_stream("/WordDocument").unwrap().write_all(word_doc).unwrap();
        comp.flush().unwrap();
        comp.into_inner().into_inner()
    }

    #[test]
    fn test_cp1252_body() {
        let text = "This is a plain legacy document with enough readable text to be detected by the scanner.";
        let data = build_doc_file(&build_word_doc(text, false, 0, ""));
        let results = read_doc(&data, Some("old.doc")).unwrap();
        let ExtractedContent::Doc(doc) = &results[0] else {
            panic!("expected doc content");
        };
        assert_eq!(doc.main_text, text);
        assert!(results[0].full_text().contains("plain legacy document"));
    }

    #[test]
    fn test_utf16_body_with_footnotes() {
        let text = "Unicode body text that the scanner should classify as UTF-16LE data here.";
        let footnote = "a footnote";
        let data = build_doc_file(&build_word_doc(text, true, footnote.chars().count() as u32, footnote));
        let results = read_doc(&data, None).unwrap();
        let ExtractedContent::Doc(doc) = &results[0] else {
            panic!("expected doc content");
        };
        assert_eq!(doc.main_text, text);
        assert_eq!(doc.footnotes, footnote);
    }

    #[test]
    fn test_control_byte_cleaning() {
        assert_eq!(clean_doc_text("a\u{7}b"), "a\tb");
        assert_eq!(clean_doc_text("line\rnext"), "line\nnext");
        assert_eq!(clean_doc_text("p1\u{c}p2"), "p1\n\np2");
        assert_eq!(clean_doc_text("a\u{13}PAGE\u{15}b"), "aPAGEb");
        assert_eq!(clean_doc_text("x\n\n\n\n\ny"), "x\n\ny");
        assert_eq!(clean_doc_text("a   b\t\t c"), "a b c");
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut word_doc = vec![0u8; 0x900];
        word_doc[0] = 0x00;
        word_doc[1] = 0x11;
        let data = build_doc_file(&word_doc);
        assert!(matches!(read_doc(&data, None), Err(DocsiftError::LegacyParse(_))));
    }

    #[test]
    fn test_encrypted_flag_rejected() {
        let mut word_doc = vec![0u8; 0x900];
        word_doc[0] = 0xEC;
        word_doc[1] = 0xA5;
        word_doc[OFF_FLAGS] = 0x00;
        word_doc[OFF_FLAGS + 1] = 0x01; // bit 8
        let data = build_doc_file(&word_doc);
        assert!(matches!(read_doc(&data, None), Err(DocsiftError::EncryptedFile(_))));
    }

    #[test]
    fn test_not_a_compound_file() {
        assert!(read_doc(b"plain text, not OLE", None).is_err());
    }
}
