//! MSG (Outlook) decoder.
//!
//! MSG files are OLE compound documents holding MAPI properties as
//! `__substg1.0_XXXXYYYY` streams (XXXX = property id, YYYY = type).
//! Strings are tried as PT_UNICODE first, then PT_STRING8. The sender
//! field is free-form text and runs through the shared recipient parser.

use crate::error::Result;
use crate::extractors::mail::{parse_recipient_list, parse_single_recipient};
use crate::types::{EmailContent, EmailMetadata, ExtractedContent};
use crate::util::ole::open_compound;
use mail_parser::MessageParser;
use std::io::{Read, Seek};

// MAPI property ids.
const PR_SUBJECT: u16 = 0x0037;
const PR_SENDER_NAME: u16 = 0x0C1A;
const PR_SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
const PR_SENT_REPRESENTING_EMAIL: u16 = 0x0065;
const PR_REPLY_RECIPIENT_NAMES: u16 = 0x0050;
const PR_DISPLAY_TO: u16 = 0x0E04;
const PR_DISPLAY_CC: u16 = 0x0E03;
const PR_DISPLAY_BCC: u16 = 0x0E02;
const PR_BODY: u16 = 0x1000;
const PR_BODY_HTML: u16 = 0x1013;
const PR_INTERNET_MESSAGE_ID: u16 = 0x1035;
const PR_IN_REPLY_TO_ID: u16 = 0x1042;
const PR_TRANSPORT_MESSAGE_HEADERS: u16 = 0x007D;

pub fn read_msg(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let mut comp = open_compound(data)?;

    let subject = read_string_prop(&mut comp, PR_SUBJECT).unwrap_or_default();
    let sender_name = read_string_prop(&mut comp, PR_SENDER_NAME).unwrap_or_default();
    let sender_email = read_string_prop(&mut comp, PR_SENDER_EMAIL_ADDRESS)
        .or_else(|| read_string_prop(&mut comp, PR_SENT_REPRESENTING_EMAIL))
        .unwrap_or_default();

    // The sender is free-form: "Name <addr>", "<addr>", "name@host", or
    // just a name.
    let sender_raw = if !sender_email.is_empty() && !sender_name.is_empty() {
        format!("{sender_name} <{sender_email}>")
    } else if !sender_email.is_empty() {
        sender_email
    } else {
        sender_name
    };
    let from_email = parse_single_recipient(&sender_raw).unwrap_or_default();

    let to_emails = read_string_prop(&mut comp, PR_DISPLAY_TO)
        .map(|s| parse_recipient_list(&s))
        .unwrap_or_default();
    let to_cc = read_string_prop(&mut comp, PR_DISPLAY_CC)
        .map(|s| parse_recipient_list(&s))
        .unwrap_or_default();
    let to_bcc = read_string_prop(&mut comp, PR_DISPLAY_BCC)
        .map(|s| parse_recipient_list(&s))
        .unwrap_or_default();
    let reply_to = read_string_prop(&mut comp, PR_REPLY_RECIPIENT_NAMES)
        .map(|s| parse_recipient_list(&s))
        .unwrap_or_default();

    let headers = read_string_prop(&mut comp, PR_TRANSPORT_MESSAGE_HEADERS);
    let date = headers.as_deref().and_then(date_from_headers).unwrap_or_default();

    let mut metadata = EmailMetadata {
        date,
        message_id: read_string_prop(&mut comp, PR_INTERNET_MESSAGE_ID).unwrap_or_default(),
        ..Default::default()
    };
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    Ok(vec![ExtractedContent::Email(EmailContent {
        subject: subject.trim().to_string(),
        from_email,
        in_reply_to: read_string_prop(&mut comp, PR_IN_REPLY_TO_ID).unwrap_or_default(),
        reply_to,
        to_emails,
        to_cc,
        to_bcc,
        body_plain: read_string_prop(&mut comp, PR_BODY)
            .map(|body| body.trim().to_string())
            .unwrap_or_default(),
        body_html: read_string_prop(&mut comp, PR_BODY_HTML).unwrap_or_default(),
        metadata,
    })])
}

/// Read a MAPI string property, trying PT_UNICODE (001F) then
/// PT_STRING8 (001E).
fn read_string_prop<F: Read + Seek>(comp: &mut cfb::CompoundFile<F>, prop_id: u16) -> Option<String> {
    let unicode_path = format!("/__substg1.0_{prop_id:04X}001F");
    if let Some(buf) = read_stream_opt(comp, &unicode_path) {
        let units: Vec<u16> = buf.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        return Some(String::from_utf16_lossy(&units).trim_end_matches('\0').to_string());
    }
    let ansi_path = format!("/__substg1.0_{prop_id:04X}001E");
    read_stream_opt(comp, &ansi_path).map(|buf| {
        String::from_utf8_lossy(&buf)
            .trim_end_matches('\0')
            .to_string()
    })
}

fn read_stream_opt<F: Read + Seek>(comp: &mut cfb::CompoundFile<F>, path: &str) -> Option<Vec<u8>> {
    let mut stream = comp.open_stream(path).ok()?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).ok()?;
    if buf.is_empty() { None } else { Some(buf) }
}

/// Pull the Date header out of the transport headers and render it as
/// ISO-8601.
fn date_from_headers(headers: &str) -> Option<String> {
    let raw = headers
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("date:"))
        .map(|line| line[5..].trim())?;
    // Reuse the RFC-822 date parser by wrapping the header in a minimal
    // message.
    let synthetic = format!("Date: {raw}\r\n\r\n");
    MessageParser::default()
        .parse(synthetic.as_bytes())
        .and_then(|message| message.date().map(|d| d.to_rfc3339()))
}
