//! EML (RFC-822) decoder built on `mail-parser`.

use crate::error::{DocsiftError, Result};
use crate::types::{EmailAddress, EmailContent, EmailMetadata, ExtractedContent};
use mail_parser::{Address, MessageParser};
use std::borrow::Cow;

pub fn read_eml(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let content = parse_eml_bytes(data, path)?;
    Ok(vec![ExtractedContent::Email(content)])
}

/// Parse one RFC-822 message into an [`EmailContent`].
pub(crate) fn parse_eml_bytes(data: &[u8], path: Option<&str>) -> Result<EmailContent> {
    // mail-parser expects ASCII/UTF-8 input; UTF-16 exports are
    // transcoded first.
    let data: Cow<'_, [u8]> = match maybe_transcode_utf16(data) {
        Some(transcoded) => Cow::Owned(transcoded),
        None => Cow::Borrowed(data),
    };

    let message = MessageParser::default()
        .parse(data.as_ref())
        .ok_or_else(|| DocsiftError::parsing("Failed to parse EML file: invalid email format"))?;

    let from_email = message
        .from()
        .and_then(Address::first)
        .map(|addr| EmailAddress {
            name: addr.name().unwrap_or("").to_string(),
            address: addr.address().unwrap_or("").to_string(),
        })
        .unwrap_or_default();

    let to_emails = message.to().map(address_list).unwrap_or_default();
    let to_cc = message.cc().map(|a| with_address_only(address_list(a))).unwrap_or_default();
    let to_bcc = message.bcc().map(|a| with_address_only(address_list(a))).unwrap_or_default();
    let reply_to = message
        .reply_to()
        .map(|a| with_address_only(address_list(a)))
        .unwrap_or_default();

    let mut metadata = EmailMetadata {
        date: message.date().map(|d| d.to_rfc3339()).unwrap_or_default(),
        message_id: message.message_id().unwrap_or("").to_string(),
        ..Default::default()
    };
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    Ok(EmailContent {
        subject: message.subject().unwrap_or("").trim().to_string(),
        from_email,
        in_reply_to: message.in_reply_to().as_text().unwrap_or("").to_string(),
        reply_to,
        to_emails,
        to_cc,
        to_bcc,
        body_plain: message
            .body_text(0)
            .map(|body| body.trim().to_string())
            .unwrap_or_default(),
        body_html: message.body_html(0).map(Cow::into_owned).unwrap_or_default(),
        metadata,
    })
}

fn address_list(address: &Address<'_>) -> Vec<EmailAddress> {
    address
        .iter()
        .map(|addr| EmailAddress {
            name: addr.name().unwrap_or("").to_string(),
            address: addr.address().unwrap_or("").to_string(),
        })
        .collect()
}

fn with_address_only(list: Vec<EmailAddress>) -> Vec<EmailAddress> {
    list.into_iter().filter(|addr| !addr.address.is_empty()).collect()
}

/// Detect UTF-16 input (with or without BOM) and transcode to UTF-8.
/// EML files start with ASCII headers, so alternating zero bytes are a
/// reliable no-BOM signal.
fn maybe_transcode_utf16(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < 4 {
        return None;
    }

    let (is_le, skip) = if data[0] == 0xFF && data[1] == 0xFE {
        (true, 2)
    } else if data[0] == 0xFE && data[1] == 0xFF {
        (false, 2)
    } else if data[1] == 0x00 && data[3] == 0x00 && data[0] != 0x00 && data[2] != 0x00 {
        (true, 0)
    } else if data[0] == 0x00 && data[2] == 0x00 && data[1] != 0x00 && data[3] != 0x00 {
        (false, 0)
    } else {
        return None;
    };

    let payload = &data[skip..];
    let units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| {
            if is_le {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok().map(String::into_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "From: Alice Example <alice@example.com>\r\n\
To: Bob <bob@example.com>, carol@example.com\r\n\
Cc: Dave <dave@example.com>\r\n\
Reply-To: <noreply@example.com>\r\n\
Subject: =?utf-8?q?Gr=C3=BC=C3=9Fe?=\r\n\
Date: Mon, 15 Jan 2024 10:30:00 +0000\r\n\
Message-ID: <abc123@example.com>\r\n\
In-Reply-To: <earlier@example.com>\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hello there!\r\n";

    #[test]
    fn test_parse_headers_and_body() {
        let content = parse_eml_bytes(SAMPLE.as_bytes(), Some("mail.eml")).unwrap();
        assert_eq!(content.from_email.name, "Alice Example");
        assert_eq!(content.from_email.address, "alice@example.com");
        assert_eq!(content.to_emails.len(), 2);
        assert_eq!(content.to_emails[1].address, "carol@example.com");
        assert_eq!(content.to_cc.len(), 1);
        assert_eq!(content.reply_to.len(), 1);
        // RFC 2047 encoded word decoded.
        assert_eq!(content.subject, "Grüße");
        assert_eq!(content.body_plain, "Hello there!");
        assert_eq!(content.metadata.message_id, "abc123@example.com");
        assert_eq!(content.in_reply_to, "earlier@example.com");
        assert!(content.metadata.date.starts_with("2024-01-15"));
    }

    #[test]
    fn test_html_body_fallback() {
        let eml = "From: a@b.c\r\nSubject: s\r\nContent-Type: text/html\r\n\r\n<p>Hi</p>";
        let content = parse_eml_bytes(eml.as_bytes(), None).unwrap();
        assert!(content.body_html.contains("Hi"));
    }

    #[test]
    fn test_utf16_transcoding() {
        let utf16: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain(
                "From: a@b.c\r\nSubject: wide\r\n\r\nbody"
                    .encode_utf16()
                    .flat_map(|u| u.to_le_bytes()),
            )
            .collect();
        let content = parse_eml_bytes(&utf16, None).unwrap();
        assert_eq!(content.subject, "wide");
    }
}
