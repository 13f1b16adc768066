//! Extraction limits.
//!
//! Defaults are deliberately high so legitimate, large exports pass while
//! extreme inputs are still rejected before they can exhaust memory.

use crate::util::zip_bomb::ZipBombLimits;

/// Resource limits applied at the `extract` boundary and inside the
/// archive walkers.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    /// Whole-file ceiling checked before any decoding. 0 disables the
    /// check.
    pub max_file_size: u64,
    /// Thresholds of the zip-bomb gate, applied to every ZIP opened.
    pub zip_bomb: ZipBombLimits,
    /// Per-entry ceiling for reading archive members into memory; larger
    /// members are skipped with a warning.
    pub archive_max_entry_bytes: u64,
    /// Whole-archive ceiling for 7z inputs.
    pub sevenz_max_archive_bytes: u64,
    /// Staged-output ceiling for 7z extraction.
    pub sevenz_max_staged_bytes: u64,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        ExtractionLimits {
            max_file_size: 100 * 1024 * 1024,
            zip_bomb: ZipBombLimits::default(),
            archive_max_entry_bytes: 10 * 1024 * 1024,
            sevenz_max_archive_bytes: 100 * 1024 * 1024,
            sevenz_max_staged_bytes: 1024 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = ExtractionLimits::default();
        assert_eq!(limits.max_file_size, 100 * 1024 * 1024);
        assert_eq!(limits.zip_bomb.max_entries, 50_000);
        assert_eq!(limits.sevenz_max_archive_bytes, 100 * 1024 * 1024);
    }
}
