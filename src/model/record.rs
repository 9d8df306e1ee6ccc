//! The canonical, format-independent email record.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::attachment::AttachmentMeta;

/// One normalized message, as produced by a format adapter.
///
/// Address-bearing fields hold lowercased raw addresses right after parsing
/// and hex hash tokens once the pseudonymizer has run. `body` and `subject`
/// never contain a literal address: adapters strip them at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Primary recipients (`To:`), deduplicated.
    pub to: Vec<String>,

    /// Sender, if recoverable.
    pub from: Option<String>,

    /// Carbon-copy recipients (`CC:`), deduplicated.
    pub recipients: Vec<String>,

    /// Addresses that appeared inside the body text, deduplicated.
    pub emails_in_body: Vec<String>,

    pub subject: String,

    pub body: String,

    /// Sent date with the offset it was written in.
    pub date: Option<DateTime<FixedOffset>>,

    #[serde(rename = "messageID")]
    pub message_id: Option<String>,

    /// Message id from the `In-Reply-To` header, not the `Reply-To`
    /// address, so no unhashed address reaches the output.
    #[serde(rename = "inReplyTo")]
    pub in_reply_to: Option<String>,

    pub attachments: Vec<AttachmentMeta>,
}

impl EmailRecord {
    /// Iterate every address-bearing value in the record.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(self.recipients.iter())
            .chain(self.emails_in_body.iter())
            .chain(self.from.iter())
            .map(String::as_str)
    }
}

/// Deduplicate addresses, keeping the first occurrence of each.
pub fn dedup_addresses(addresses: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    addresses
        .into_iter()
        .filter(|a| seen.insert(a.clone()))
        .collect()
}
