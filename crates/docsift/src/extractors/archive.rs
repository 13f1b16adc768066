//! Archive walker for ZIP, TAR (plain/gz/bz2/xz), and 7z.
//!
//! The archive type is detected from magic bytes, each member is
//! filtered (directories, hidden files, unsupported types, nested
//! archives, oversized entries), and surviving entries are read into
//! memory and dispatched back through the router under a pseudo-path of
//! the form `archive.ext!/inner/path`.

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use crate::extractors::sevenzip::read_sevenzip;
use crate::mime::is_archive_path;
use crate::router;
use crate::types::ExtractedContent;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

const TAR_MAGIC_OFFSET: usize = 257;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    SevenZ,
    TarGz,
    TarBz2,
    TarXz,
    Tar,
}

fn detect_archive_kind(data: &[u8]) -> Option<ArchiveKind> {
    if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
        return Some(ArchiveKind::Zip);
    }
    if data.starts_with(b"7z\xbc\xaf\x27\x1c") {
        return Some(ArchiveKind::SevenZ);
    }
    if data.starts_with(&[0x1F, 0x8B]) {
        return Some(ArchiveKind::TarGz);
    }
    if data.starts_with(b"BZ") {
        return Some(ArchiveKind::TarBz2);
    }
    if data.starts_with(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]) {
        return Some(ArchiveKind::TarXz);
    }
    if data.len() > TAR_MAGIC_OFFSET + 5 && &data[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == b"ustar" {
        return Some(ArchiveKind::Tar);
    }
    None
}

pub fn read_archive(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    read_archive_with_limits(data, path, &ExtractionLimits::default())
}

pub fn read_archive_with_limits(
    data: &[u8],
    path: Option<&str>,
    limits: &ExtractionLimits,
) -> Result<Vec<ExtractedContent>> {
    let Some(kind) = detect_archive_kind(data) else {
        return Err(DocsiftError::parsing("Unrecognized archive format"));
    };

    match kind {
        ArchiveKind::Zip => walk_zip(data, path, limits),
        ArchiveKind::SevenZ => walk_sevenzip(data, path, limits),
        ArchiveKind::Tar => walk_tar(data.to_vec(), path, limits),
        ArchiveKind::TarGz => {
            let mut decompressed = Vec::new();
            flate2::read::GzDecoder::new(Cursor::new(data))
                .read_to_end(&mut decompressed)
                .map_err(|e| DocsiftError::parsing(format!("Failed to decompress gzip stream: {e}")))?;
            walk_tar(decompressed, path, limits)
        }
        ArchiveKind::TarBz2 => {
            let mut decompressed = Vec::new();
            bzip2::read::BzDecoder::new(Cursor::new(data))
                .read_to_end(&mut decompressed)
                .map_err(|e| DocsiftError::parsing(format!("Failed to decompress bzip2 stream: {e}")))?;
            walk_tar(decompressed, path, limits)
        }
        ArchiveKind::TarXz => {
            let mut decompressed = Vec::new();
            lzma_rust2::XzReader::new(Cursor::new(data), true)
                .read_to_end(&mut decompressed)
                .map_err(|e| DocsiftError::parsing(format!("Failed to decompress xz stream: {e}")))?;
            walk_tar(decompressed, path, limits)
        }
    }
}

/// Filtering shared by all walkers.
fn should_skip(filename: &str, basename: &str) -> bool {
    if basename.starts_with('.') || filename.starts_with("__MACOSX/") {
        return true;
    }
    if !router::is_supported(basename) {
        return true;
    }
    // No recursive descent into nested archives.
    if is_archive_path(basename) {
        return true;
    }
    false
}

/// Decode one member through the router, forwarding its content objects.
/// Per-entry failures are logged and skipped; the walk continues.
fn dispatch_entry(
    filename: &str,
    file_data: &[u8],
    archive_path: Option<&str>,
    results: &mut Vec<ExtractedContent>,
) {
    let pseudo_path = match archive_path {
        Some(outer) => format!("{outer}!/{filename}"),
        None => filename.to_string(),
    };
    match router::decode_supported_bytes(file_data, &pseudo_path) {
        Ok(contents) => results.extend(contents),
        Err(e) => warn!("Failed to extract {filename} from archive: {e}"),
    }
}

fn walk_zip(data: &[u8], archive_path: Option<&str>, limits: &ExtractionLimits) -> Result<Vec<ExtractedContent>> {
    let mut archive = crate::util::zip_bomb::open_validated_zip(data, &limits.zip_bomb)?;

    // Any encrypted entry fails the whole archive before extraction.
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| DocsiftError::parsing(format!("Invalid ZIP archive: {e}")))?;
        if entry.encrypted() {
            return Err(DocsiftError::EncryptedFile(
                "Encrypted/password-protected ZIP archives are not supported".to_string(),
            ));
        }
    }

    let mut results = Vec::new();
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to open ZIP entry {i}: {e}");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }

        let filename = entry.name().to_string();
        let basename = filename.rsplit('/').next().unwrap_or(&filename).to_string();
        if should_skip(&filename, &basename) {
            debug!("Skipping archive entry {filename}");
            continue;
        }
        if entry.size() > limits.archive_max_entry_bytes {
            warn!("File {filename} too large ({} bytes), skipping", entry.size());
            continue;
        }

        let mut file_data = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut file_data) {
            warn!("Failed to read ZIP entry {filename}: {e}");
            continue;
        }
        dispatch_entry(&filename, &file_data, archive_path, &mut results);
    }

    Ok(results)
}

fn walk_tar(data: Vec<u8>, archive_path: Option<&str>, limits: &ExtractionLimits) -> Result<Vec<ExtractedContent>> {
    let mut archive = tar::Archive::new(Cursor::new(data));
    let mut results = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| DocsiftError::parsing(format!("Invalid TAR archive: {e}")))?;
    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read TAR entry: {e}");
                continue;
            }
        };
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let filename = match entry.path() {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => {
                warn!("Failed to read TAR entry path: {e}");
                continue;
            }
        };
        let basename = filename.rsplit('/').next().unwrap_or(&filename).to_string();
        if should_skip(&filename, &basename) {
            debug!("Skipping archive entry {filename}");
            continue;
        }
        if entry.size() > limits.archive_max_entry_bytes {
            warn!("File {filename} too large ({} bytes), skipping", entry.size());
            continue;
        }

        let mut file_data = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut file_data) {
            warn!("Failed to read TAR entry {filename}: {e}");
            continue;
        }
        dispatch_entry(&filename, &file_data, archive_path, &mut results);
    }

    Ok(results)
}

fn walk_sevenzip(data: &[u8], archive_path: Option<&str>, limits: &ExtractionLimits) -> Result<Vec<ExtractedContent>> {
    let mut results = Vec::new();
    for entry in read_sevenzip(data, limits)? {
        let basename = entry.path.rsplit(['/', '\\']).next().unwrap_or(&entry.path).to_string();
        if should_skip(&entry.path, &basename) {
            debug!("Skipping archive entry {}", entry.path);
            continue;
        }
        if entry.data.len() as u64 > limits.archive_max_entry_bytes {
            warn!("File {} too large ({} bytes), skipping", entry.path, entry.data.len());
            continue;
        }
        dispatch_entry(&entry.path, &entry.data, archive_path, &mut results);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options: FileOptions<()> = FileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_detect_archive_kinds() {
        assert_eq!(detect_archive_kind(b"PK\x03\x04rest"), Some(ArchiveKind::Zip));
        assert_eq!(detect_archive_kind(b"7z\xbc\xaf\x27\x1crest"), Some(ArchiveKind::SevenZ));
        assert_eq!(detect_archive_kind(&[0x1F, 0x8B, 0x08]), Some(ArchiveKind::TarGz));
        assert_eq!(detect_archive_kind(b"BZh9"), Some(ArchiveKind::TarBz2));
        assert_eq!(
            detect_archive_kind(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]),
            Some(ArchiveKind::TarXz)
        );
        let mut tar = vec![0u8; 512];
        tar[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5].copy_from_slice(b"ustar");
        assert_eq!(detect_archive_kind(&tar), Some(ArchiveKind::Tar));
        assert_eq!(detect_archive_kind(b"plain"), None);
    }

    #[test]
    fn test_zip_walk_dispatches_supported_entries() {
        let data = build_zip(&[
            ("readme.txt", b"hello from the archive"),
            ("page.html", b"<html><body><p>web text</p></body></html>"),
            ("skipped.xyz", b"unknown"),
            (".hidden.txt", b"hidden"),
            ("__MACOSX/junk.txt", b"junk"),
            ("nested.zip", b"PK\x03\x04fake"),
        ]);
        let results = read_archive(&data, Some("bundle.zip")).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].full_text().contains("hello from the archive"));
        assert!(results[1].full_text().contains("web text"));
        // Pseudo-paths carry the archive context.
        assert!(results[0].file_metadata().file_path.contains("bundle.zip!/readme.txt"));
    }

    #[test]
    fn test_tar_gz_walk() {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let content = b"tarred text";
            let mut header = tar::Header::new_gnu();
            header.set_path("inner/note.txt").unwrap();
            header.set_size(content.len() as u64);
            header.set_cksum();
            builder.append(&header, &content[..]).unwrap();
            builder.finish().unwrap();
        }
        let mut gz = Vec::new();
        {
            let mut encoder = flate2::write::GzEncoder::new(&mut gz, flate2::Compression::default());
            encoder.write_all(&tar_bytes).unwrap();
            encoder.finish().unwrap();
        }

        let results = read_archive(&gz, Some("bundle.tar.gz")).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].full_text().contains("tarred text"));
    }

    #[test]
    fn test_oversized_entry_skipped() {
        let big = vec![b'a'; 64];
        let data = build_zip(&[("big.txt", big.as_slice()), ("ok.txt", b"fine")]);
        let limits = ExtractionLimits {
            archive_max_entry_bytes: 16,
            ..Default::default()
        };
        let results = read_archive_with_limits(&data, None, &limits).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].full_text().contains("fine"));
    }

    #[test]
    fn test_unrecognized_bytes_fail() {
        assert!(read_archive(b"not an archive at all", None).is_err());
    }
}
