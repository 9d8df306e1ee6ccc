//! Source-format adapters (EML, MSG, PST) and the decoding helpers they share.
//!
//! Every adapter turns one source file into zero or more canonical
//! [`EmailRecord`]s through the [`FormatAdapter`] trait; callers never see
//! format-specific message objects.

pub mod address;
pub mod eml;
pub mod header;
pub mod mime;
pub mod msg;
pub mod pst;

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::model::record::{dedup_addresses, EmailRecord};

/// Default bound on message-within-message recursion.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 8;

/// The source container formats understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceFormat {
    /// Outlook single-message compound file.
    Msg,
    /// RFC 5322 message file.
    Eml,
    /// Outlook personal-folders archive.
    Pst,
}

impl SourceFormat {
    /// Pick a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "msg" => Some(Self::Msg),
            "eml" => Some(Self::Eml),
            "pst" => Some(Self::Pst),
            _ => None,
        }
    }

    /// Pick a format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Msg => "msg",
            Self::Eml => "eml",
            Self::Pst => "pst",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Converts one source file into canonical records.
///
/// An `Err` means the whole source contributed nothing; failures of
/// individual messages inside a container are logged and skipped by the
/// adapter itself.
pub trait FormatAdapter: Send + Sync {
    /// The format this adapter handles.
    fn format(&self) -> SourceFormat;

    /// Parse `source` into zero or more records.
    fn parse_one(&self, source: &Path) -> Result<Vec<EmailRecord>>;
}

/// Deduplicated, lowercased addresses found across several header values.
pub(crate) fn address_set<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    dedup_addresses(values.into_iter().flat_map(address::extract_all))
}

/// Split a body into its address set and its address-free text.
pub(crate) fn scrub_body(body: &str) -> (Vec<String>, String) {
    let found = dedup_addresses(address::extract_all(body));
    (found, address::strip_all(body).into_owned())
}
