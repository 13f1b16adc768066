//! Error types for docsift.
//!
//! All fallible operations in the library return [`Result`], whose error
//! type is the single [`DocsiftError`] enum. The variants form a closed
//! taxonomy: callers can match on them to distinguish "this format is not
//! handled" from "this file is damaged" from "this file is protected".
//!
//! IO errors bubble up unchanged via `#[from]`; anything unexpected inside
//! a decoder is wrapped into [`DocsiftError::ExtractionFailed`] with the
//! original error preserved as `source`.

use thiserror::Error;

/// Result type alias using [`DocsiftError`].
pub type Result<T> = std::result::Result<T, DocsiftError>;

/// Main error type for all docsift operations.
#[derive(Debug, Error)]
pub enum DocsiftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The router found no decoder for the path.
    #[error("File type not supported: {path}")]
    FormatNotSupported { path: String },

    /// An encryption probe fired, or a downstream parser reported
    /// encrypted content. No decryption is attempted.
    #[error("File is encrypted or password-protected: {0}")]
    EncryptedFile(String),

    /// A legacy compound-document decoder rejected the file (bad magic,
    /// truncated FIB, inconsistent record header).
    #[error("Legacy Office parsing failed: {0}")]
    LegacyParse(String),

    /// The size gate at the `extract` boundary rejected the file.
    #[error("File size {actual_size} bytes exceeds maximum allowed size of {max_size} bytes")]
    FileTooLarge { max_size: u64, actual_size: u64 },

    /// The zip-bomb gate rejected an archive. The message names the
    /// violated limit.
    #[error("Zip bomb detected: {0}")]
    ZipBomb(String),

    /// Catch-all for unexpected failures during decoding.
    #[error("Extraction failed: {message}")]
    ExtractionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DocsiftError {
    /// Wrap an unexpected failure, without a source error.
    pub fn parsing(message: impl Into<String>) -> Self {
        DocsiftError::ExtractionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an unexpected failure, preserving the original cause.
    pub fn parsing_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DocsiftError::ExtractionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True when the error is part of the stable taxonomy rather than a
    /// wrapped unexpected failure. Taxonomy errors are re-raised unchanged
    /// by the top-level `extract`.
    pub fn is_taxonomy(&self) -> bool {
        !matches!(self, DocsiftError::ExtractionFailed { .. })
    }
}

impl From<serde_json::Error> for DocsiftError {
    fn from(err: serde_json::Error) -> Self {
        DocsiftError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DocsiftError::FileTooLarge {
            max_size: 100,
            actual_size: 200,
        };
        assert_eq!(
            err.to_string(),
            "File size 200 bytes exceeds maximum allowed size of 100 bytes"
        );

        let err = DocsiftError::FormatNotSupported {
            path: "a.xyz".to_string(),
        };
        assert!(err.to_string().contains("a.xyz"));
    }

    #[test]
    fn test_parsing_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "boom");
        let err = DocsiftError::parsing_with_source("decode failed", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_taxonomy());
    }
}
