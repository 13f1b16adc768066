//! Zip-bomb gate.
//!
//! Best-effort DoS mitigation, not a complete sandbox: the declared sizes
//! in the central directory are checked against high-confidence bomb
//! indicators before anything is decompressed.

use crate::error::{DocsiftError, Result};
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Thresholds for rejecting probable ZIP bombs.
#[derive(Debug, Clone)]
pub struct ZipBombLimits {
    pub max_entries: usize,
    pub max_total_uncompressed_bytes: u64,
    pub max_single_uncompressed_bytes: u64,
    pub max_total_compression_ratio: f64,
    pub max_entry_compression_ratio: f64,
}

impl Default for ZipBombLimits {
    fn default() -> Self {
        ZipBombLimits {
            max_entries: 50_000,
            max_total_uncompressed_bytes: 4 * 1024 * 1024 * 1024,
            max_single_uncompressed_bytes: 1024 * 1024 * 1024,
            max_total_compression_ratio: 200.0,
            max_entry_compression_ratio: 500.0,
        }
    }
}

/// Validate an opened ZIP against the limits. Directories are excluded
/// from the accounting; an entry that declares uncompressed content with
/// zero compressed bytes is rejected outright.
pub fn validate_zip<R: Read + Seek>(archive: &mut ZipArchive<R>, limits: &ZipBombLimits) -> Result<()> {
    if archive.len() > limits.max_entries {
        return Err(DocsiftError::ZipBomb(format!(
            "too many entries ({} > {})",
            archive.len(),
            limits.max_entries
        )));
    }

    let mut total_uncompressed: u64 = 0;
    let mut total_compressed: u64 = 0;

    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| DocsiftError::ZipBomb(format!("failed to inspect entry {i}: {e}")))?;
        if entry.is_dir() || entry.name().ends_with('/') {
            continue;
        }

        let file_size = entry.size();
        let compressed_size = entry.compressed_size();

        if file_size > limits.max_single_uncompressed_bytes {
            return Err(DocsiftError::ZipBomb(format!(
                "entry too large ({} bytes > {})",
                file_size, limits.max_single_uncompressed_bytes
            )));
        }

        if file_size > 0 {
            if compressed_size == 0 {
                return Err(DocsiftError::ZipBomb(
                    "entry has zero compressed size but non-zero uncompressed size".to_string(),
                ));
            }
            let ratio = file_size as f64 / compressed_size as f64;
            if ratio > limits.max_entry_compression_ratio {
                return Err(DocsiftError::ZipBomb(format!(
                    "entry compression ratio too high ({:.1} > {})",
                    ratio, limits.max_entry_compression_ratio
                )));
            }
        }

        total_uncompressed += file_size;
        total_compressed += compressed_size;

        if total_uncompressed > limits.max_total_uncompressed_bytes {
            return Err(DocsiftError::ZipBomb(format!(
                "total uncompressed size too large ({} bytes > {})",
                total_uncompressed, limits.max_total_uncompressed_bytes
            )));
        }
    }

    if total_uncompressed > 0 {
        if total_compressed == 0 {
            return Err(DocsiftError::ZipBomb(
                "archive has non-zero uncompressed content but zero total compressed size".to_string(),
            ));
        }
        let total_ratio = total_uncompressed as f64 / total_compressed as f64;
        if total_ratio > limits.max_total_compression_ratio {
            return Err(DocsiftError::ZipBomb(format!(
                "total compression ratio too high ({:.1} > {})",
                total_ratio, limits.max_total_compression_ratio
            )));
        }
    }

    Ok(())
}

/// Open a ZIP over in-memory bytes and validate it in one step.
pub fn open_validated_zip<'a>(data: &'a [u8], limits: &ZipBombLimits) -> Result<ZipArchive<std::io::Cursor<&'a [u8]>>> {
    let mut archive = ZipArchive::new(std::io::Cursor::new(data))
        .map_err(|e| DocsiftError::parsing(format!("Failed to open ZIP container: {e}")))?;
    validate_zip(&mut archive, limits)?;
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
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
    fn test_accepts_normal_archive() {
        let data = build_zip(&[("a.txt", b"hello"), ("b.txt", b"world")]);
        assert!(open_validated_zip(&data, &ZipBombLimits::default()).is_ok());
    }

    #[test]
    fn test_rejects_entry_count() {
        let data = build_zip(&[("a.txt", b"x"), ("b.txt", b"y"), ("c.txt", b"z")]);
        let limits = ZipBombLimits {
            max_entries: 2,
            ..Default::default()
        };
        match open_validated_zip(&data, &limits) {
            Err(DocsiftError::ZipBomb(msg)) => assert!(msg.contains("too many entries")),
            other => panic!("expected ZipBomb, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_entry_ratio() {
        // Highly repetitive content compresses far beyond a ratio of 2.
        let big = vec![b'a'; 1024 * 1024];
        let data = build_zip(&[("big.txt", &big)]);
        let limits = ZipBombLimits {
            max_entry_compression_ratio: 2.0,
            max_total_compression_ratio: f64::MAX,
            ..Default::default()
        };
        match open_validated_zip(&data, &limits) {
            Err(DocsiftError::ZipBomb(msg)) => assert!(msg.contains("compression ratio")),
            other => panic!("expected ZipBomb, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_single_entry_size() {
        let big = vec![b'a'; 4096];
        let data = build_zip(&[("big.txt", &big)]);
        let limits = ZipBombLimits {
            max_single_uncompressed_bytes: 1024,
            ..Default::default()
        };
        assert!(matches!(
            open_validated_zip(&data, &limits),
            Err(DocsiftError::ZipBomb(_))
        ));
    }
}
