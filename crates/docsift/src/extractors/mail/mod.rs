//! Mail decoders: EML (RFC-822), MBOX, and MSG (Outlook).

mod eml;
mod mbox;
mod msg;

pub use eml::read_eml;
pub use mbox::read_mbox;
pub use msg::read_msg;

use crate::types::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;

static TAIL_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^>]+)>\s*$").unwrap());

/// Parse one free-form recipient string: `Name <addr>`, bare `<addr>`,
/// bare `name@host`, or just a name.
pub(crate) fn parse_single_recipient(raw: &str) -> Option<EmailAddress> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(captures) = TAIL_ADDRESS_RE.captures(raw) {
        let address = captures[1].trim().to_string();
        let name = raw[..captures.get(0).map(|m| m.start()).unwrap_or(0)]
            .trim()
            .trim_matches(['"', '\''])
            .to_string();
        return Some(EmailAddress { name, address });
    }

    if raw.contains('@') && !raw.contains(' ') {
        return Some(EmailAddress {
            name: String::new(),
            address: raw.to_string(),
        });
    }

    Some(EmailAddress {
        name: raw.to_string(),
        address: String::new(),
    })
}

/// Split a recipient display string on `;`/`,` and parse each entry.
/// Entries without an address are dropped.
pub(crate) fn parse_recipient_list(raw: &str) -> Vec<EmailAddress> {
    raw.split([';', ','])
        .filter_map(parse_single_recipient)
        .filter(|addr| !addr.address.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_recipient_forms() {
        let full = parse_single_recipient("Benny Bottema <benny@example.com>").unwrap();
        assert_eq!(full.name, "Benny Bottema");
        assert_eq!(full.address, "benny@example.com");

        let bare_brackets = parse_single_recipient("<benny@example.com>").unwrap();
        assert_eq!(bare_brackets.name, "");
        assert_eq!(bare_brackets.address, "benny@example.com");

        let bare = parse_single_recipient("benny@example.com").unwrap();
        assert_eq!(bare.address, "benny@example.com");

        let name_only = parse_single_recipient("Benny Bottema").unwrap();
        assert_eq!(name_only.name, "Benny Bottema");
        assert_eq!(name_only.address, "");

        assert!(parse_single_recipient("   ").is_none());
    }

    #[test]
    fn test_recipient_list_drops_addressless() {
        let list = parse_recipient_list("Alice <alice@example.com>; Just A Name, bob@example.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].address, "alice@example.com");
        assert_eq!(list[1].address, "bob@example.com");
    }
}
