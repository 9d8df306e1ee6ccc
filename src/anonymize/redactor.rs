//! Removes dictionary names from message subjects and bodies.

use std::sync::Arc;

use tracing::debug;

use super::names::NameDictionary;
use crate::model::record::EmailRecord;

/// Drops whitespace-separated tokens that are known names.
#[derive(Debug, Clone)]
pub struct NameRedactor {
    dict: Arc<NameDictionary>,
    legacy_leading_space: bool,
}

impl NameRedactor {
    pub fn new(dict: Arc<NameDictionary>) -> Self {
        Self {
            dict,
            legacy_leading_space: false,
        }
    }

    /// Emit a space before every surviving token, the historical output
    /// layout, instead of joining tokens with single spaces.
    pub fn with_legacy_leading_space(mut self, enabled: bool) -> Self {
        self.legacy_leading_space = enabled;
        self
    }

    /// Redact `body` and `subject` of every record.
    pub fn redact(&self, mut records: Vec<EmailRecord>) -> Vec<EmailRecord> {
        for record in &mut records {
            record.body = self.redact_text(&record.body);
            record.subject = self.redact_text(&record.subject);
        }
        debug!(records = records.len(), "Names redacted");
        records
    }

    /// Split on whitespace, drop name tokens, and rejoin the rest in order.
    ///
    /// Lookup ignores `. , ! ? ' "` anywhere in the token; surviving tokens
    /// keep their original punctuation.
    pub fn redact_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for token in text.split_whitespace() {
            if self.dict.is_name(token) {
                continue;
            }
            if self.legacy_leading_space || !out.is_empty() {
                out.push(' ');
            }
            out.push_str(token);
        }
        out
    }
}
