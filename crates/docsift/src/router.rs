//! Path → decoder routing.
//!
//! Routing never looks at file content: the (case-insensitive) extension
//! drives a MIME guess, the MIME drives the decoder, and a handful of
//! extension-authoritative cases (`.mht`/`.mhtml`, the archive suffixes)
//! are resolved before the MIME tables. A path with no mapping fails
//! with `FormatNotSupported`.

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use crate::extractors;
use crate::mime::{self, FileFormat};
use crate::types::ExtractedContent;
use tracing::debug;

/// Resolve the decoder for a path. The file does not need to exist; the
/// path string alone decides.
pub fn lookup(path: &str) -> Result<FileFormat> {
    let lower = path.to_ascii_lowercase();

    if mime::is_archive_path(&lower) {
        return Ok(FileFormat::Archive);
    }

    if let Some(ext) = mime::extension_of(&lower) {
        // Extension is authoritative where the MIME guess collides
        // (MHTML vs EML).
        if let Some(format) = mime::format_for_extension(&ext) {
            return Ok(format);
        }
    }

    if let Some(mime_type) = mime::mime_for_path(&lower)
        && let Some(format) = mime::format_for_mime(mime_type)
    {
        debug!("Detected format {format:?} (MIME: {mime_type}) for {path}");
        return Ok(format);
    }

    Err(DocsiftError::FormatNotSupported {
        path: path.to_string(),
    })
}

/// True when [`lookup`] resolves a decoder for the path.
pub fn is_supported(path: &str) -> bool {
    lookup(path).is_ok()
}

/// Decode in-memory bytes with the decoder the router picks for `path`.
pub(crate) fn decode_supported_bytes(data: &[u8], path: &str) -> Result<Vec<ExtractedContent>> {
    let format = lookup(path)?;
    decode(format, data, Some(path), &ExtractionLimits::default())
}

/// Dispatch to a concrete decoder.
pub(crate) fn decode(
    format: FileFormat,
    data: &[u8],
    path: Option<&str>,
    limits: &ExtractionLimits,
) -> Result<Vec<ExtractedContent>> {
    match format {
        FileFormat::Doc => extractors::doc::read_doc(data, path),
        FileFormat::Docx => extractors::docx::read_docx(data, path),
        FileFormat::Xls => extractors::xls::read_xls(data, path),
        FileFormat::Xlsx => extractors::xlsx::read_xlsx(data, path),
        FileFormat::Ppt => extractors::ppt::read_ppt(data, path),
        FileFormat::Pptx => extractors::pptx::read_pptx(data, path),
        FileFormat::Rtf => extractors::rtf::read_rtf(data, path),
        FileFormat::Odt => extractors::odf::read_odt(data, path),
        FileFormat::Odp => extractors::odf::read_odp(data, path),
        FileFormat::Ods => extractors::odf::read_ods(data, path),
        FileFormat::Pdf => extractors::pdf::read_pdf(data, path),
        FileFormat::PlainText => extractors::plain::read_plain_text(data, path),
        FileFormat::Html => extractors::html::read_html(data, path),
        FileFormat::Mhtml => extractors::mhtml::read_mhtml(data, path),
        FileFormat::Epub => extractors::epub::read_epub(data, path),
        FileFormat::Eml => extractors::mail::read_eml(data, path),
        FileFormat::Mbox => extractors::mail::read_mbox(data, path),
        FileFormat::Msg => extractors::mail::read_msg(data, path),
        FileFormat::Archive => extractors::archive::read_archive_with_limits(data, path, limits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_extension() {
        assert_eq!(lookup("report.docx").unwrap(), FileFormat::Docx);
        assert_eq!(lookup("REPORT.DOCX").unwrap(), FileFormat::Docx);
        assert_eq!(lookup("old.doc").unwrap(), FileFormat::Doc);
        assert_eq!(lookup("macro.docm").unwrap(), FileFormat::Docx);
        assert_eq!(lookup("sheet.xlsx").unwrap(), FileFormat::Xlsx);
        assert_eq!(lookup("deck.pptm").unwrap(), FileFormat::Pptx);
        assert_eq!(lookup("notes.txt").unwrap(), FileFormat::PlainText);
        assert_eq!(lookup("data.csv").unwrap(), FileFormat::PlainText);
        assert_eq!(lookup("mail.eml").unwrap(), FileFormat::Eml);
        assert_eq!(lookup("box.mbox").unwrap(), FileFormat::Mbox);
        assert_eq!(lookup("mail.msg").unwrap(), FileFormat::Msg);
        assert_eq!(lookup("book.epub").unwrap(), FileFormat::Epub);
        assert_eq!(lookup("doc.pdf").unwrap(), FileFormat::Pdf);
        assert_eq!(lookup("text.odt").unwrap(), FileFormat::Odt);
    }

    #[test]
    fn test_mhtml_overrides_mime_guess() {
        assert_eq!(lookup("saved.mht").unwrap(), FileFormat::Mhtml);
        assert_eq!(lookup("saved.mhtml").unwrap(), FileFormat::Mhtml);
    }

    #[test]
    fn test_archive_suffixes() {
        assert_eq!(lookup("bundle.zip").unwrap(), FileFormat::Archive);
        assert_eq!(lookup("bundle.tar.gz").unwrap(), FileFormat::Archive);
        assert_eq!(lookup("bundle.7z").unwrap(), FileFormat::Archive);
    }

    #[test]
    fn test_unsupported_path() {
        let err = lookup("binary.exe").unwrap_err();
        assert!(matches!(err, DocsiftError::FormatNotSupported { .. }));
        assert!(!is_supported("binary.exe"));
        assert!(!is_supported("noextension"));
        assert!(is_supported("fine.html"));
    }
}
