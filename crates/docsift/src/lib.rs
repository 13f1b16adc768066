//! # docsift
//!
//! Text, structure, metadata, and media extraction from office
//! documents, mail, and archives, projected onto one introspectable
//! content model.
//!
//! The library routes a path to a concrete decoder by extension/MIME,
//! applies defensive limits (size gate, encryption probes, zip-bomb
//! detection), and returns content objects that expose logical units
//! (pages, slides, sheets, chapters), embedded images, metadata, and a
//! full-text projection. Archive inputs are walked recursively, each
//! member dispatched back through the router.
//!
//! ```no_run
//! use docsift::{Content, extract};
//!
//! # fn main() -> docsift::Result<()> {
//! for content in extract("report.docx")? {
//!     println!("{}", content.full_text());
//!     for unit in content.units() {
//!         println!("{} {}: {} chars", unit.kind.as_str(), unit.number, unit.text.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All extraction is synchronous; independent inputs may be processed on
//! independent threads. The library installs no tracing subscriber and
//! writes no files except short-lived staging directories for MBOX and
//! 7z inputs.

pub mod config;
pub mod error;
pub mod mime;
pub mod router;
pub mod serialize;
pub mod types;

mod extractors;
mod util;

pub use config::ExtractionLimits;
pub use error::{DocsiftError, Result};
pub use util::zip_bomb::ZipBombLimits;
pub use mime::FileFormat;
pub use router::{is_supported, lookup};
pub use serialize::{deserialize, serialize, serialize_units};
pub use types::{Content, ExtractedContent};

// Per-format entry points over in-memory bytes.
pub use extractors::archive::read_archive;
pub use extractors::doc::read_doc;
pub use extractors::docx::read_docx;
pub use extractors::epub::read_epub;
pub use extractors::html::read_html;
pub use extractors::mail::{read_eml, read_mbox, read_msg};
pub use extractors::mhtml::read_mhtml;
pub use extractors::odf::{read_odp, read_ods, read_odt};
pub use extractors::pdf::read_pdf;
pub use extractors::plain::read_plain_text;
pub use extractors::ppt::read_ppt;
pub use extractors::pptx::read_pptx;
pub use extractors::rtf::read_rtf;
pub use extractors::xls::read_xls;
pub use extractors::xlsx::read_xlsx;

use std::path::Path;
use tracing::debug;

/// Read a file from disk and extract its content objects.
///
/// The file is rejected before any decoding when it exceeds the default
/// 100 MiB size gate. Taxonomy errors ([`DocsiftError::FormatNotSupported`],
/// [`DocsiftError::EncryptedFile`], …) surface unchanged; anything
/// unexpected is wrapped in [`DocsiftError::ExtractionFailed`].
pub fn extract(path: impl AsRef<Path>) -> Result<Vec<ExtractedContent>> {
    extract_with_limits(path, &ExtractionLimits::default())
}

/// [`extract`] with caller-supplied limits.
pub fn extract_with_limits(path: impl AsRef<Path>, limits: &ExtractionLimits) -> Result<Vec<ExtractedContent>> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().into_owned();

    let format = router::lookup(&path_str)?;

    if limits.max_file_size > 0 {
        let file_size = std::fs::metadata(path)?.len();
        if file_size > limits.max_file_size {
            return Err(DocsiftError::FileTooLarge {
                max_size: limits.max_file_size,
                actual_size: file_size,
            });
        }
    }

    debug!("Extracting {path_str} as {format:?}");
    let data = std::fs::read(path)?;
    router::decode(format, &data, Some(&path_str), limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extract_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("note.txt");
        std::fs::write(&file_path, "from disk").unwrap();

        let results = extract(&file_path).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].full_text(), "from disk");
        assert_eq!(results[0].file_metadata().filename, "note.txt");
    }

    #[test]
    fn test_extract_unsupported_extension() {
        let err = extract("/nowhere/file.xyz").unwrap_err();
        assert!(matches!(err, DocsiftError::FormatNotSupported { .. }));
    }

    #[test]
    fn test_size_gate() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("big.txt");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(&vec![b'x'; 4096]).unwrap();
        drop(file);

        let limits = ExtractionLimits {
            max_file_size: 1024,
            ..Default::default()
        };
        let err = extract_with_limits(&file_path, &limits).unwrap_err();
        assert!(matches!(err, DocsiftError::FileTooLarge { .. }));

        // A zero gate disables the check.
        let unlimited = ExtractionLimits {
            max_file_size: 0,
            ..Default::default()
        };
        assert!(extract_with_limits(&file_path, &unlimited).is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = extract("/definitely/missing/file.txt").unwrap_err();
        assert!(matches!(err, DocsiftError::Io(_)));
    }
}
