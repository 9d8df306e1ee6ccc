//! One pretty-printed JSON file per emitted record.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{Result, ScrubError};
use crate::model::record::EmailRecord;

/// `email-<index>.json`, numbered from 0 in emission order.
pub fn record_file_name(index: usize) -> String {
    format!("email-{index}.json")
}

/// Serialize a record with four-space indentation.
pub fn to_json(record: &EmailRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    record
        .serialize(&mut ser)
        .map_err(|e| ScrubError::Export(format!("serialize record: {e}")))?;
    Ok(buf)
}

pub fn write_record(record: &EmailRecord, path: &Path) -> Result<()> {
    let json = to_json(record)?;
    let mut file = std::fs::File::create(path).map_err(|e| ScrubError::io(path, e))?;
    file.write_all(&json).map_err(|e| ScrubError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attachment::AttachmentMeta;

    #[test]
    fn test_field_names() {
        let record = EmailRecord {
            from: Some("h".into()),
            message_id: Some("<m@x>".into()),
            attachments: vec![AttachmentMeta::new("a.pdf", 3)],
            ..Default::default()
        };
        let value: serde_json::Value =
            serde_json::from_slice(&to_json(&record).expect("json")).expect("parse");
        assert_eq!(value["from"], "h");
        assert_eq!(value["messageID"], "<m@x>");
        assert!(value["inReplyTo"].is_null());
        assert!(value["date"].is_null());
        assert_eq!(value["emails_in_body"], serde_json::json!([]));
        assert_eq!(value["attachments"][0]["filename"], "a.pdf");
        assert_eq!(value["attachments"][0]["size"], 3);
    }

    #[test]
    fn test_four_space_indent() {
        let text = String::from_utf8(to_json(&EmailRecord::default()).expect("json")).expect("utf8");
        assert!(text.starts_with("{\n    \"to\": []"));
    }

    #[test]
    fn test_record_file_name() {
        assert_eq!(record_file_name(0), "email-0.json");
        assert_eq!(record_file_name(12), "email-12.json");
    }
}
