//! Integration tests for the EML, MSG and PST format adapters.

mod common;

use std::path::Path;

use common::{filetime, fixture, MsgBuilder, PT_LONG, PT_SYSTIME};
use mailscrub::error::{ErrorKind, Result};
use mailscrub::model::attachment::AttachmentMeta;
use mailscrub::parser::eml::EmlAdapter;
use mailscrub::parser::msg::MsgAdapter;
use mailscrub::parser::pst::{ArchiveBackend, ExtractedArchive, PstAdapter};
use mailscrub::parser::FormatAdapter;

// ─── EML ────────────────────────────────────────────────────────────

#[test]
fn test_eml_simple_fields() {
    let records = EmlAdapter::default().parse_one(&fixture("simple.eml")).unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];

    assert_eq!(r.from.as_deref(), Some("john.smith@acme.com"));
    assert_eq!(r.to, vec!["a@x.com"]);
    assert_eq!(r.recipients, vec!["mary.jones@partner.org"]);
    assert_eq!(r.emails_in_body, vec!["john@acme.com"]);
    assert_eq!(r.subject, "Budget review");
    assert!(r.body.contains("Contact John Smith at ."));
    assert_eq!(
        r.date.map(|d| d.to_rfc3339()).as_deref(),
        Some("2024-01-04T10:00:00+01:00")
    );
    assert_eq!(r.message_id.as_deref(), Some("<budget-001@acme.com>"));
    assert_eq!(r.in_reply_to.as_deref(), Some("<budget-000@acme.com>"));
}

#[test]
fn test_eml_multipart_walks_nested_message() {
    let records = EmlAdapter::default().parse_one(&fixture("multipart.eml")).unwrap();
    let r = &records[0];

    assert_eq!(r.subject, "Report für Mary");
    assert!(r.body.contains("Weekly numbers attached."));
    assert!(r.body.contains("Forwarded text from"));
    assert!(!r.body.contains("<p>"));
    assert!(!r.body.contains('@'));
    assert_eq!(r.emails_in_body, vec!["ops@acme.com", "legacy@old.example.com"]);
    assert_eq!(r.attachments, vec![AttachmentMeta::new("numbers.pdf", 11)]);
}

#[test]
fn test_eml_nesting_limit_skips_attached_message() {
    let records = EmlAdapter::new(0).parse_one(&fixture("multipart.eml")).unwrap();
    assert!(!records[0].body.contains("Forwarded text"));
    assert_eq!(records[0].emails_in_body, vec!["ops@acme.com"]);
}

#[test]
fn test_eml_html_only_body() {
    let records = EmlAdapter::default().parse_one(&fixture("html_only.eml")).unwrap();
    let r = &records[0];
    assert!(r.body.contains("Hello & welcome"));
    assert!(!r.body.contains('<'));
    assert_eq!(r.emails_in_body, vec!["help@letters.example.org"]);
}

// ─── MSG ────────────────────────────────────────────────────────────

const PR_SUBJECT: u16 = 0x0037;
const PR_CLIENT_SUBMIT_TIME: u16 = 0x0039;
const PR_RECIPIENT_TYPE: u16 = 0x0C15;
const PR_SENDER_EMAIL: u16 = 0x0C1F;
const PR_BODY: u16 = 0x1000;
const PR_HTML: u16 = 0x1013;
const PR_INTERNET_MESSAGE_ID: u16 = 0x1035;
const PR_IN_REPLY_TO: u16 = 0x1042;
const PR_EMAIL_ADDRESS: u16 = 0x3003;
const PR_ATTACH_DATA: u16 = 0x3701;
const PR_ATTACH_METHOD: u16 = 0x3705;
const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;
const PR_ATTACH_CONTENT_ID: u16 = 0x3712;
const PR_SMTP_ADDRESS: u16 = 0x39FE;
const PR_SENDER_SMTP_ADDRESS: u16 = 0x5D01;

const RECIP_0: &str = "/__recip_version1.0_#00000000";
const RECIP_1: &str = "/__recip_version1.0_#00000001";
const ATTACH_0: &str = "/__attach_version1.0_#00000000";
const ATTACH_1: &str = "/__attach_version1.0_#00000001";
const ATTACH_2: &str = "/__attach_version1.0_#00000002";
const EMBEDDED: &str = "/__attach_version1.0_#00000002/__substg1.0_3701000D";

/// A message with To/CC recipients, one file attachment, one inline image
/// and one embedded message.
fn outlook_message() -> Vec<u8> {
    let mut msg = MsgBuilder::new();
    msg.properties(
        "/",
        32,
        &[(PR_CLIENT_SUBMIT_TIME, PT_SYSTIME, filetime(1_704_362_400))],
    )
    .unicode("/", PR_SUBJECT, "Quarterly plan")
    .unicode("/", PR_BODY, "Hi team, see plan. Contact bob@corp.example.com")
    .unicode("/", PR_SENDER_SMTP_ADDRESS, "Sender@Corp.example.com")
    .unicode("/", PR_INTERNET_MESSAGE_ID, "<msg-1@corp.example.com>")
    .unicode("/", PR_IN_REPLY_TO, "<msg-0@corp.example.com>");

    msg.storage(RECIP_0)
        .properties(RECIP_0, 8, &[(PR_RECIPIENT_TYPE, PT_LONG, 1)])
        .unicode(RECIP_0, PR_SMTP_ADDRESS, "to1@corp.example.com");
    msg.storage(RECIP_1)
        .properties(RECIP_1, 8, &[(PR_RECIPIENT_TYPE, PT_LONG, 2)])
        .unicode(RECIP_1, PR_EMAIL_ADDRESS, "CC1@corp.example.com");

    msg.storage(ATTACH_0)
        .properties(ATTACH_0, 8, &[(PR_ATTACH_METHOD, PT_LONG, 1)])
        .unicode(ATTACH_0, PR_ATTACH_LONG_FILENAME, "plan.xlsx")
        .binary(ATTACH_0, PR_ATTACH_DATA, &[7u8; 10]);
    msg.storage(ATTACH_1)
        .properties(ATTACH_1, 8, &[(PR_ATTACH_METHOD, PT_LONG, 1)])
        .unicode(ATTACH_1, PR_ATTACH_LONG_FILENAME, "logo.png")
        .unicode(ATTACH_1, PR_ATTACH_CONTENT_ID, "logo001")
        .binary(ATTACH_1, PR_ATTACH_DATA, &[1u8; 4]);
    msg.storage(ATTACH_2)
        .properties(ATTACH_2, 8, &[(PR_ATTACH_METHOD, PT_LONG, 5)])
        .storage(EMBEDDED)
        .properties(EMBEDDED, 24, &[])
        .unicode(EMBEDDED, PR_SUBJECT, "Inner note")
        .unicode(EMBEDDED, PR_SENDER_EMAIL, "inner@else.example.com")
        .unicode(EMBEDDED, PR_BODY, "inner body");
    msg.finish()
}

#[test]
fn test_msg_fields_and_attachments() {
    let records = MsgAdapter::default()
        .parse_bytes(&outlook_message(), Path::new("plan.msg"))
        .unwrap();
    assert_eq!(records.len(), 2, "embedded message is flattened into its own record");

    let outer = &records[0];
    assert_eq!(outer.from.as_deref(), Some("sender@corp.example.com"));
    assert_eq!(outer.to, vec!["to1@corp.example.com"]);
    assert_eq!(outer.recipients, vec!["cc1@corp.example.com"]);
    assert_eq!(outer.emails_in_body, vec!["bob@corp.example.com"]);
    assert!(!outer.body.contains('@'));
    assert_eq!(outer.subject, "Quarterly plan");
    assert_eq!(
        outer.date.map(|d| d.to_rfc3339()).as_deref(),
        Some("2024-01-04T10:00:00+00:00")
    );
    assert_eq!(outer.message_id.as_deref(), Some("<msg-1@corp.example.com>"));
    assert_eq!(outer.in_reply_to.as_deref(), Some("<msg-0@corp.example.com>"));
    assert_eq!(outer.attachments, vec![AttachmentMeta::new("plan.xlsx", 10)]);

    let inner = &records[1];
    assert_eq!(inner.subject, "Inner note");
    assert_eq!(inner.from.as_deref(), Some("inner@else.example.com"));
    assert_eq!(inner.body, "inner body");
    assert!(inner.date.is_none());
}

#[test]
fn test_msg_nesting_limit() {
    let records = MsgAdapter::new(0)
        .parse_bytes(&outlook_message(), Path::new("plan.msg"))
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_msg_html_body_fallback() {
    let mut msg = MsgBuilder::new();
    msg.properties("/", 32, &[])
        .unicode("/", PR_SUBJECT, "html")
        .binary("/", PR_HTML, b"<html><body><p>Styled &amp; bold</p></body></html>");
    let records = MsgAdapter::default()
        .parse_bytes(&msg.finish(), Path::new("html.msg"))
        .unwrap();
    assert_eq!(records[0].body, "Styled & bold");
    assert_eq!(records[0].from, None);
}

#[test]
fn test_msg_not_a_compound_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.msg");
    std::fs::write(&path, b"this is plain text").unwrap();
    let err = MsgAdapter::default().parse_one(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedMessage);
}

// ─── PST ────────────────────────────────────────────────────────────

/// Lays out a pre-extracted folder tree, as `readpst -S` would.
struct FixtureBackend;

impl ArchiveBackend for FixtureBackend {
    type Reader = ExtractedArchive;

    fn open(&self, _archive: &Path, scratch: &Path) -> Result<ExtractedArchive> {
        common::copy_tree(&fixture("pst_extract"), scratch);
        Ok(ExtractedArchive::new(scratch))
    }
}

#[test]
fn test_pst_two_leaf_messages() {
    let adapter = PstAdapter::new(FixtureBackend, EmlAdapter::default());
    let (records, stats) = adapter.parse_archive(Path::new("mailbox.pst")).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(stats.converted, 2);
    assert_eq!(stats.dropped, 0);

    // Folders are walked in name order: Archive before Inbox.
    let reply = &records[0];
    assert_eq!(reply.from.as_deref(), Some("buyer@acme.com"));
    assert_eq!(reply.in_reply_to.as_deref(), Some("<pst-1@vendor.example.com>"));
    assert!(reply.attachments.is_empty());

    let draft = &records[1];
    assert_eq!(draft.from.as_deref(), Some("alice@vendor.example.com"));
    assert_eq!(draft.subject, "Contract draft");
    assert_eq!(draft.attachments, vec![AttachmentMeta::new("contract.pdf", 23)]);
    assert!(draft.body.contains("Draft attached"));
}
