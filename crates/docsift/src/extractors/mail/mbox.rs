//! MBOX decoder.
//!
//! An mbox is a stream of RFC-822 messages separated by "From " lines.
//! The input is staged through a temporary file (mailboxes can be large),
//! split on the separator, and each message runs through the EML path.
//! The staging file is removed on all exit paths.

use crate::error::{DocsiftError, Result};
use crate::extractors::mail::eml::parse_eml_bytes;
use crate::types::ExtractedContent;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use tracing::debug;

pub fn read_mbox(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let mut staging = tempfile::tempfile().map_err(DocsiftError::Io)?;
    staging.write_all(data)?;
    staging.seek(SeekFrom::Start(0))?;

    let mut results = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut in_message = false;

    let reader = BufReader::new(staging);
    for line in reader.split(b'\n') {
        let mut line = line?;
        line.push(b'\n');

        if line.starts_with(b"From ") {
            flush_message(&current, path, &mut results);
            current.clear();
            in_message = true;
            continue;
        }

        if in_message {
            // Reverse mboxrd-style quoting of body lines that start with
            // "From ".
            if line.starts_with(b">") && is_quoted_from(&line) {
                current.extend_from_slice(&line[1..]);
            } else {
                current.extend_from_slice(&line);
            }
        }
    }
    flush_message(&current, path, &mut results);

    if results.is_empty() {
        return Err(DocsiftError::parsing("No messages found in mbox file"));
    }
    Ok(results)
}

fn is_quoted_from(line: &[u8]) -> bool {
    let stripped: &[u8] = {
        let mut rest = line;
        while let Some(tail) = rest.strip_prefix(b">") {
            rest = tail;
        }
        rest
    };
    stripped.starts_with(b"From ")
}

fn flush_message(raw: &[u8], path: Option<&str>, results: &mut Vec<ExtractedContent>) {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return;
    }
    match parse_eml_bytes(raw, path) {
        Ok(content) => results.push(ExtractedContent::Email(content)),
        Err(e) => debug!("Skipping unparseable mbox message: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;

    const MBOX: &str = "From alice@example.com Mon Jan 15 10:30:00 2024\n\
From: alice@example.com\n\
Subject: first\n\
\n\
Body one.\n\
>From a quoted line.\n\
\n\
From bob@example.com Tue Jan 16 11:00:00 2024\n\
From: bob@example.com\n\
Subject: second\n\
\n\
Body two.\n";

    #[test]
    fn test_two_messages_in_order() {
        let results = read_mbox(MBOX.as_bytes(), Some("inbox.mbox")).unwrap();
        assert_eq!(results.len(), 2);

        let ExtractedContent::Email(first) = &results[0] else {
            panic!("expected email");
        };
        assert_eq!(first.subject, "first");
        assert!(first.body_plain.contains("Body one."));
        assert!(first.body_plain.contains("From a quoted line."));

        let ExtractedContent::Email(second) = &results[1] else {
            panic!("expected email");
        };
        assert_eq!(second.subject, "second");
        assert_eq!(second.metadata.file.filename, "inbox.mbox");
    }

    #[test]
    fn test_empty_mbox_fails() {
        assert!(read_mbox(b"", None).is_err());
    }

    #[test]
    fn test_full_text_is_body() {
        let results = read_mbox(MBOX.as_bytes(), None).unwrap();
        assert!(results[0].full_text().contains("Body one."));
    }
}
