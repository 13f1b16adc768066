//! Plain-text decoder (txt/csv/tsv/md/json).
//!
//! The only work is charset detection: bytes are decoded with the sniffer
//! and the detected label lands in the file metadata.

use crate::error::Result;
use crate::types::{ExtractedContent, FileMetadata, PlainTextContent};
use crate::util::encoding::decode_with_detection;

pub fn read_plain_text(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let (content, encoding_label) = decode_with_detection(data);

    let mut metadata = FileMetadata::default();
    if let Some(path) = path {
        metadata.populate_from_path(path);
    }
    metadata.detected_encoding = Some(encoding_label);

    Ok(vec![ExtractedContent::PlainText(PlainTextContent {
        content,
        metadata,
    })])
}
