//! Extension and MIME tables backing the router.
//!
//! The extension → MIME mapping is fixed: detection never sniffs file
//! content, only the (case-insensitive) extension. The MIME → format
//! mapping is the authoritative list of what the library decodes.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const DOC_MIME_TYPE: &str = "application/msword";
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOCM_MIME_TYPE: &str = "application/vnd.ms-word.document.macroEnabled.12";
pub const XLS_MIME_TYPE: &str = "application/vnd.ms-excel";
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLSM_MIME_TYPE: &str = "application/vnd.ms-excel.sheet.macroEnabled.12";
pub const PPT_MIME_TYPE: &str = "application/vnd.ms-powerpoint";
pub const PPTX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const PPTM_MIME_TYPE: &str = "application/vnd.ms-powerpoint.presentation.macroEnabled.12";
pub const RTF_MIME_TYPE: &str = "application/rtf";
pub const ODT_MIME_TYPE: &str = "application/vnd.oasis.opendocument.text";
pub const ODP_MIME_TYPE: &str = "application/vnd.oasis.opendocument.presentation";
pub const ODS_MIME_TYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";
pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const HTML_MIME_TYPE: &str = "text/html";
pub const EPUB_MIME_TYPE: &str = "application/epub+zip";
pub const EML_MIME_TYPE: &str = "message/rfc822";
pub const MBOX_MIME_TYPE: &str = "application/mbox";
pub const MSG_MIME_TYPE: &str = "application/vnd.ms-outlook";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

/// The concrete decoders the router can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Doc,
    Docx,
    Xls,
    Xlsx,
    Ppt,
    Pptx,
    Rtf,
    Odt,
    Odp,
    Ods,
    Pdf,
    PlainText,
    Html,
    Mhtml,
    Epub,
    Eml,
    Mbox,
    Msg,
    Archive,
}

/// Extension (without dot, lowercase) → MIME type.
static EXT_TO_MIME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("doc", DOC_MIME_TYPE);
    m.insert("dot", DOC_MIME_TYPE);
    m.insert("docx", DOCX_MIME_TYPE);
    m.insert("docm", DOCM_MIME_TYPE);

    m.insert("xls", XLS_MIME_TYPE);
    m.insert("xlsx", XLSX_MIME_TYPE);
    m.insert("xlsm", XLSM_MIME_TYPE);

    m.insert("ppt", PPT_MIME_TYPE);
    m.insert("pptx", PPTX_MIME_TYPE);
    m.insert("pptm", PPTM_MIME_TYPE);

    m.insert("rtf", RTF_MIME_TYPE);

    m.insert("odt", ODT_MIME_TYPE);
    m.insert("odp", ODP_MIME_TYPE);
    m.insert("ods", ODS_MIME_TYPE);

    m.insert("pdf", PDF_MIME_TYPE);

    m.insert("txt", PLAIN_TEXT_MIME_TYPE);
    m.insert("csv", "text/csv");
    m.insert("tsv", "text/tab-separated-values");
    m.insert("md", "text/markdown");
    m.insert("json", "application/json");

    m.insert("html", HTML_MIME_TYPE);
    m.insert("htm", HTML_MIME_TYPE);

    // .mht/.mhtml intentionally absent: MHTML routing is extension-based
    // because the natural MIME guess (message/rfc822) collides with EML.

    m.insert("epub", EPUB_MIME_TYPE);

    m.insert("eml", EML_MIME_TYPE);
    m.insert("mbox", MBOX_MIME_TYPE);
    m.insert("msg", MSG_MIME_TYPE);

    m
});

/// MIME type → decoder. `text/rtf` is accepted as an alias.
static MIME_TO_FORMAT: Lazy<HashMap<&'static str, FileFormat>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert(DOC_MIME_TYPE, FileFormat::Doc);
    m.insert(DOCX_MIME_TYPE, FileFormat::Docx);
    m.insert(DOCM_MIME_TYPE, FileFormat::Docx);
    m.insert(XLS_MIME_TYPE, FileFormat::Xls);
    m.insert(XLSX_MIME_TYPE, FileFormat::Xlsx);
    m.insert(XLSM_MIME_TYPE, FileFormat::Xlsx);
    m.insert(PPT_MIME_TYPE, FileFormat::Ppt);
    m.insert(PPTX_MIME_TYPE, FileFormat::Pptx);
    m.insert(PPTM_MIME_TYPE, FileFormat::Pptx);
    m.insert(RTF_MIME_TYPE, FileFormat::Rtf);
    m.insert("text/rtf", FileFormat::Rtf);
    m.insert(ODT_MIME_TYPE, FileFormat::Odt);
    m.insert(ODP_MIME_TYPE, FileFormat::Odp);
    m.insert(ODS_MIME_TYPE, FileFormat::Ods);
    m.insert(PDF_MIME_TYPE, FileFormat::Pdf);
    m.insert(PLAIN_TEXT_MIME_TYPE, FileFormat::PlainText);
    m.insert("text/csv", FileFormat::PlainText);
    m.insert("application/csv", FileFormat::PlainText);
    m.insert("text/tab-separated-values", FileFormat::PlainText);
    m.insert("application/tab-separated-values", FileFormat::PlainText);
    m.insert("text/markdown", FileFormat::PlainText);
    m.insert("application/json", FileFormat::PlainText);
    m.insert("text/json", FileFormat::PlainText);
    m.insert(HTML_MIME_TYPE, FileFormat::Html);
    m.insert("application/xhtml+xml", FileFormat::Html);
    m.insert(EPUB_MIME_TYPE, FileFormat::Epub);
    m.insert(EML_MIME_TYPE, FileFormat::Eml);
    m.insert(MBOX_MIME_TYPE, FileFormat::Mbox);
    m.insert(MSG_MIME_TYPE, FileFormat::Msg);

    m
});

/// Extension → decoder fallback for extensions whose MIME guess yields no
/// mapping, plus the extension-authoritative special cases.
static EXT_TO_FORMAT: Lazy<HashMap<&'static str, FileFormat>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("mht", FileFormat::Mhtml);
    m.insert("mhtml", FileFormat::Mhtml);
    m
});

/// Extension → MIME for image payloads embedded in documents.
static IMAGE_EXT_TO_MIME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("png", "image/png");
    m.insert("jpg", "image/jpeg");
    m.insert("jpeg", "image/jpeg");
    m.insert("jpe", "image/jpeg");
    m.insert("gif", "image/gif");
    m.insert("bmp", "image/bmp");
    m.insert("tiff", "image/tiff");
    m.insert("tif", "image/tiff");
    m.insert("webp", "image/webp");
    m.insert("emf", "image/x-emf");
    m.insert("wmf", "image/x-wmf");
    m.insert("svg", "image/svg+xml");
    m.insert("ico", "image/x-icon");
    m
});

/// Lowercased extension of a path, without the leading dot.
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        // Dotfiles like ".gitignore" carry no extension.
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME guess for a path, from the extension table alone.
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    let ext = extension_of(path)?;
    EXT_TO_MIME.get(ext.as_str()).copied()
}

/// Decoder for a MIME type.
pub fn format_for_mime(mime: &str) -> Option<FileFormat> {
    MIME_TO_FORMAT.get(mime).copied()
}

/// Decoder for an extension, used when the MIME guess yields nothing and
/// for the extension-authoritative formats (MHTML).
pub fn format_for_extension(ext: &str) -> Option<FileFormat> {
    EXT_TO_FORMAT.get(ext).copied()
}

/// True when the path ends in one of the recognized archive suffixes.
pub fn is_archive_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    const SUFFIXES: &[&str] = &[
        ".zip", ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz", ".7z",
    ];
    SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// MIME type for an embedded image filename, defaulting to octet-stream.
pub fn image_mime_for_name(name: &str) -> &'static str {
    extension_of(name)
        .and_then(|ext| IMAGE_EXT_TO_MIME.get(ext.as_str()).copied())
        .unwrap_or("application/octet-stream")
}
