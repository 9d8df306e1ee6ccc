//! Attachment metadata.
//!
//! Only the name and size survive into the scrubbed dataset. The payload
//! itself is never copied into a record.

/// Metadata about an email attachment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttachmentMeta {
    /// Filename of the attachment. Generated if missing from the source.
    pub filename: String,

    /// Decoded size in bytes.
    pub size: u64,
}

impl AttachmentMeta {
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
        }
    }

    /// Placeholder name for attachments that carry no filename.
    pub fn fallback_name(index: usize) -> String {
        format!("attachment_{index}")
    }
}
