//! Gated 7z reading.
//!
//! 7z archives get stricter treatment than ZIP/TAR: a whole-archive size
//! ceiling, a staged-output ceiling, and password detection up front.
//! Extraction is staged into a temporary directory (removed on all exit
//! paths) and entries are read back sequentially; entry paths that are
//! absolute or would escape the staging root are rejected.

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use sevenz_rust2::{ArchiveReader, Password};
use std::io::Cursor;
use std::path::{Component, Path};

/// One extracted member: (path inside the archive, bytes).
pub struct SevenZipEntry {
    pub path: String,
    pub data: Vec<u8>,
}

/// Extract all regular files from a 7z archive, honoring the limits.
pub fn read_sevenzip(data: &[u8], limits: &ExtractionLimits) -> Result<Vec<SevenZipEntry>> {
    if data.len() as u64 > limits.sevenz_max_archive_bytes {
        return Err(DocsiftError::FileTooLarge {
            max_size: limits.sevenz_max_archive_bytes,
            actual_size: data.len() as u64,
        });
    }

    let mut reader = match ArchiveReader::new(Cursor::new(data), Password::empty()) {
        Ok(reader) => reader,
        Err(e) => {
            let message = e.to_string();
            if is_password_error(&message) {
                return Err(DocsiftError::EncryptedFile(
                    "7z archive is password-protected".to_string(),
                ));
            }
            return Err(DocsiftError::parsing(format!("Failed to read 7z archive: {e}")));
        }
    };

    // Declared sizes are checked before any decompression.
    let mut declared_total: u64 = 0;
    for entry in &reader.archive().files {
        if entry.is_directory() {
            continue;
        }
        declared_total = declared_total.saturating_add(entry.size());
    }
    if declared_total > limits.sevenz_max_staged_bytes {
        return Err(DocsiftError::ZipBomb(format!(
            "7z declared output too large ({declared_total} bytes > {})",
            limits.sevenz_max_staged_bytes
        )));
    }

    // Stage through a temp dir; cleanup is tied to the TempDir guard.
    let staging = tempfile::tempdir().map_err(DocsiftError::Io)?;
    let staging_root = staging.path().to_path_buf();

    let mut entries = Vec::new();
    let mut staged_bytes: u64 = 0;
    let extraction = reader.for_each_entries(&mut |entry: &sevenz_rust2::ArchiveEntry, entry_reader: &mut dyn std::io::Read| {
        if entry.is_directory() {
            return Ok(true);
        }
        let name = entry.name().to_string();
        let Some(relative) = safe_relative_path(&name) else {
            tracing::warn!("Skipping unsafe 7z entry path '{name}'");
            return Ok(true);
        };

        let target = staging_root.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&target)?;
        let written = std::io::copy(entry_reader, &mut file)?;
        staged_bytes += written;
        if staged_bytes > limits.sevenz_max_staged_bytes {
            return Err(sevenz_rust2::Error::Other(
                "staged output exceeds the memory ceiling".into(),
            ));
        }
        entries.push((name, target));
        Ok(true)
    });

    if let Err(e) = extraction {
        let message = e.to_string();
        if is_password_error(&message) {
            return Err(DocsiftError::EncryptedFile(
                "7z archive is password-protected".to_string(),
            ));
        }
        if message.contains("memory ceiling") {
            return Err(DocsiftError::ZipBomb(message));
        }
        return Err(DocsiftError::parsing(format!("Failed to extract 7z archive: {e}")));
    }

    // Read the staged files back in archive order.
    let mut out = Vec::with_capacity(entries.len());
    for (path, staged_path) in entries {
        let data = std::fs::read(&staged_path)?;
        out.push(SevenZipEntry { path, data });
    }

    // TempDir drop removes the staging tree even on early returns above.
    drop(staging);
    Ok(out)
}

fn is_password_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("password") || lower.contains("encrypted") || lower.contains("aes")
}

/// Reject absolute paths and any path whose normalization escapes the
/// extraction root.
fn safe_relative_path(name: &str) -> Option<std::path::PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return None;
    }
    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    let sanitized: std::path::PathBuf = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_safety() {
        assert!(safe_relative_path("docs/a.txt").is_some());
        assert!(safe_relative_path("a.txt").is_some());
        assert!(safe_relative_path("/etc/passwd").is_none());
        assert!(safe_relative_path("../escape.txt").is_none());
        assert!(safe_relative_path("a/../../escape.txt").is_none());
        assert!(safe_relative_path("a/../b.txt").is_some());
        assert!(safe_relative_path("").is_none());
    }

    #[test]
    fn test_oversized_archive_rejected() {
        let limits = ExtractionLimits {
            sevenz_max_archive_bytes: 4,
            ..Default::default()
        };
        let result = read_sevenzip(b"7z\xbc\xaf\x27\x1c more", &limits);
        assert!(matches!(result, Err(DocsiftError::FileTooLarge { .. })));
    }

    #[test]
    fn test_garbage_rejected() {
        let limits = ExtractionLimits::default();
        assert!(read_sevenzip(b"definitely not a 7z archive", &limits).is_err());
    }
}
