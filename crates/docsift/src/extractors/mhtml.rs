//! MHTML (web archive) decoder.
//!
//! An MHTML file is a MIME multipart message whose primary part is the
//! page HTML. The message is parsed with `mail-parser`, the first
//! `text/html` part is located, and its body runs through the HTML
//! decoder.

use crate::error::{DocsiftError, Result};
use crate::extractors::html::extract_from_str;
use crate::types::ExtractedContent;
use mail_parser::{MessageParser, MimeHeaders};

pub fn read_mhtml(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let message = MessageParser::default()
        .parse(data)
        .ok_or_else(|| DocsiftError::parsing("Failed to parse MHTML file: invalid MIME structure"))?;

    // Primary page: the first text/html body part.
    let html = if let Some(body) = message.body_html(0) {
        body.into_owned()
    } else {
        // Some generators mark the page part as an attachment; take the
        // first text/html attachment instead.
        let part = message
            .attachments()
            .find(|part| {
                part.content_type()
                    .is_some_and(|ct| ct.ctype().eq_ignore_ascii_case("text") && ct.subtype().is_some_and(|s| s.eq_ignore_ascii_case("html")))
            })
            .ok_or_else(|| DocsiftError::parsing("MHTML file contains no text/html part"))?;
        String::from_utf8_lossy(part.contents()).into_owned()
    };

    let content = extract_from_str(&html, path, "utf-8");
    Ok(vec![ExtractedContent::Html(content)])
}
