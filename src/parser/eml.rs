//! Adapter for individual `.eml` files (RFC 5322 messages without MBOX framing).

use std::path::Path;

use mail_parser::MessageParser;

use crate::error::{Result, ScrubError};
use crate::model::record::EmailRecord;
use crate::parser::header::HeaderFields;
use crate::parser::{address, mime, scrub_body, FormatAdapter, SourceFormat};

/// Decodes a MIME message into one [`EmailRecord`].
#[derive(Debug, Clone)]
pub struct EmlAdapter {
    max_depth: usize,
}

impl EmlAdapter {
    /// `max_depth` bounds descent into attached `message/rfc822` parts.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parse raw message bytes. `origin` is only used for error context.
    pub fn parse_bytes(&self, raw: &[u8], origin: &Path) -> Result<EmailRecord> {
        let raw = mime::skip_from_line(raw);
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ScrubError::malformed(origin, "empty message"));
        }

        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| ScrubError::malformed(origin, "MIME structure could not be decoded"))?;
        let headers = HeaderFields::from_message(&message);
        let content = mime::collect_content(&message, self.max_depth);

        let (emails_in_body, body) = scrub_body(&content.body_text());
        let subject = headers.subject.unwrap_or_default();

        Ok(EmailRecord {
            to: headers.to,
            from: headers.from,
            recipients: headers.cc,
            emails_in_body,
            subject: address::strip_all(&subject).into_owned(),
            body,
            date: headers.date,
            message_id: headers.message_id,
            in_reply_to: headers.in_reply_to,
            attachments: content.attachments,
        })
    }
}

impl Default for EmlAdapter {
    fn default() -> Self {
        Self::new(super::DEFAULT_MAX_NESTING_DEPTH)
    }
}

impl FormatAdapter for EmlAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::Eml
    }

    fn parse_one(&self, source: &Path) -> Result<Vec<EmailRecord>> {
        let data = std::fs::read(source)
            .map_err(|e| ScrubError::malformed(source, format!("read failed: {e}")))?;
        self.parse_bytes(&data, source).map(|record| vec![record])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> EmailRecord {
        EmlAdapter::default()
            .parse_bytes(raw.as_bytes(), Path::new("test.eml"))
            .expect("parse")
    }

    #[test]
    fn test_header_fields() {
        let record = parse(concat!(
            "From: \"Ann Lee\" <Ann.Lee@Example.com>\n",
            "To: a@x.com, A@X.COM\n",
            "CC: Bob <bob@y.org>\n",
            "Subject: Quarterly numbers\n",
            "Date: Thu, 04 Jan 2024 10:00:00 +0100\n",
            "Message-ID: <m1@example.com>\n",
            "In-Reply-To: <m0@example.com>\n",
            "Reply-To: boss@example.com\n",
            "\n",
            "Hello.\n",
        ));
        assert_eq!(record.from.as_deref(), Some("ann.lee@example.com"));
        assert_eq!(record.to, vec!["a@x.com"]);
        assert_eq!(record.recipients, vec!["bob@y.org"]);
        assert_eq!(record.subject, "Quarterly numbers");
        assert_eq!(
            record.date.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-04T10:00:00+01:00")
        );
        assert_eq!(record.message_id.as_deref(), Some("<m1@example.com>"));
        assert_eq!(record.in_reply_to.as_deref(), Some("<m0@example.com>"));
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn test_body_addresses_are_stripped() {
        let record = parse("From: a@x.com\nSubject: ping b@y.com\n\nContact John Smith at john@acme.com.\n");
        assert_eq!(record.emails_in_body, vec!["john@acme.com"]);
        assert!(!record.body.contains('@'));
        assert!(record.body.contains("Contact John Smith at ."));
        assert_eq!(record.subject, "ping ");
    }

    #[test]
    fn test_missing_sender_and_bad_date_are_null() {
        let record = parse("From: Undisclosed\nDate: not a date\n\nbody\n");
        assert_eq!(record.from, None);
        assert_eq!(record.date, None);
        assert_eq!(record.subject, "");
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let err = EmlAdapter::default()
            .parse_bytes(b"  \n", Path::new("empty.eml"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedMessage);
    }

    #[test]
    fn test_missing_file_is_malformed() {
        let err = EmlAdapter::default()
            .parse_one(Path::new("/nonexistent/definitely/missing.eml"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedMessage);
    }
}
