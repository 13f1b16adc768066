//! Content model for mail formats (EML, MBOX, MSG).

use super::{Content, FileMetadata, ImageRecord, Unit, UnitKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailAddress {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailMetadata {
    pub file: FileMetadata,
    /// ISO-8601 date of the message.
    pub date: String,
    pub message_id: String,
}

/// One extracted mail message. An MBOX yields one of these per message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailContent {
    pub from_email: EmailAddress,
    pub subject: String,
    pub in_reply_to: String,
    pub reply_to: Vec<EmailAddress>,
    pub to_emails: Vec<EmailAddress>,
    pub to_cc: Vec<EmailAddress>,
    pub to_bcc: Vec<EmailAddress>,
    pub body_plain: String,
    pub body_html: String,
    pub metadata: EmailMetadata,
}

impl EmailContent {
    /// The body used for text projection: plain when present, else HTML.
    pub fn body(&self) -> &str {
        if !self.body_plain.is_empty() {
            &self.body_plain
        } else {
            &self.body_html
        }
    }
}

impl Content for EmailContent {
    fn units(&self) -> Vec<Unit> {
        vec![Unit {
            number: 1,
            kind: UnitKind::MailBody,
            text: self.body().to_string(),
        }]
    }

    fn images(&self) -> &[ImageRecord] {
        &[]
    }

    fn file_metadata(&self) -> &FileMetadata {
        &self.metadata.file
    }

    fn type_tag(&self) -> &'static str {
        "EmailContent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_prefers_plain() {
        let mut mail = EmailContent {
            body_plain: "plain".into(),
            body_html: "<p>html</p>".into(),
            ..Default::default()
        };
        assert_eq!(mail.body(), "plain");
        mail.body_plain.clear();
        assert_eq!(mail.body(), "<p>html</p>");
    }
}
