//! Adapter for Outlook `.pst` archives.
//!
//! An archive is opened through an [`ArchiveBackend`] into a scratch
//! directory that lives exactly as long as the [`FormatAdapter::parse_one`]
//! call. Every leaf message is serialized to a loose RFC 5322 form, its
//! `Content-Type` forced to `text/plain`, decoded with the EML adapter, and
//! then given the attachment list from the archive's own attachment index.
//! A message that fails any of these steps is logged and dropped; only a
//! failure to open the archive fails the whole source.

pub mod readpst;

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, ScrubError};
use crate::model::attachment::AttachmentMeta;
use crate::model::record::EmailRecord;
use crate::parser::eml::EmlAdapter;
use crate::parser::{mime, FormatAdapter, SourceFormat};

pub use readpst::{ExtractedArchive, ReadpstBackend};

/// Folder trees deeper than this are not walked any further.
pub const MAX_FOLDER_DEPTH: usize = 64;

/// Read access to one opened archive.
pub trait ArchiveReader {
    type Folder;
    type Message;

    /// The top of the folder tree.
    fn root(&self) -> Result<Self::Folder>;

    /// Display name of a folder, for logging.
    fn folder_name(&self, folder: &Self::Folder) -> String;

    /// Direct child folders, in a stable order.
    fn subfolders(&self, folder: &Self::Folder) -> Result<Vec<Self::Folder>>;

    /// Messages stored directly in `folder`, in a stable order.
    fn messages(&self, folder: &Self::Folder) -> Result<Vec<Self::Message>>;

    /// Serialize a message to loose RFC 5322 bytes.
    fn to_rfc822(&self, message: &Self::Message) -> Result<Vec<u8>>;

    /// Attachment metadata from the archive's attachment index.
    fn attachments(&self, message: &Self::Message) -> Result<Vec<AttachmentMeta>>;
}

/// Opens archives. `scratch` is an empty directory owned by the caller
/// for the lifetime of the returned reader.
pub trait ArchiveBackend: Send + Sync {
    type Reader: ArchiveReader;

    fn open(&self, archive: &Path, scratch: &Path) -> Result<Self::Reader>;
}

/// Outcome counters for one archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub folders: usize,
    pub converted: usize,
    pub dropped: usize,
}

/// Flattens an archive into one record per leaf message.
pub struct PstAdapter<B> {
    backend: B,
    eml: EmlAdapter,
}

impl<B: ArchiveBackend> PstAdapter<B> {
    pub fn new(backend: B, eml: EmlAdapter) -> Self {
        Self { backend, eml }
    }

    /// Parse an archive, also returning its outcome counters.
    pub fn parse_archive(&self, source: &Path) -> Result<(Vec<EmailRecord>, ArchiveStats)> {
        let scratch = tempfile::Builder::new()
            .prefix("mailscrub-pst-")
            .tempdir()
            .map_err(|e| ScrubError::archive(source, format!("scratch directory: {e}")))?;
        debug!(path = %source.display(), scratch = %scratch.path().display(), "Opening archive");

        let mut records = Vec::new();
        let stats = {
            let reader = self.backend.open(source, scratch.path())?;
            self.walk(&reader, source, &mut records)?
        };

        if let Err(e) = scratch.close() {
            warn!(path = %source.display(), error = %e, "Failed to remove archive scratch directory");
        }

        info!(
            path = %source.display(),
            folders = stats.folders,
            converted = stats.converted,
            dropped = stats.dropped,
            "Archive processed"
        );
        Ok((records, stats))
    }

    /// Depth-first walk of the folder tree using an explicit stack.
    fn walk(
        &self,
        reader: &B::Reader,
        source: &Path,
        out: &mut Vec<EmailRecord>,
    ) -> Result<ArchiveStats> {
        let mut stats = ArchiveStats::default();
        let mut stack = vec![(reader.root()?, 0usize)];

        while let Some((folder, depth)) = stack.pop() {
            stats.folders += 1;
            let name = reader.folder_name(&folder);

            match reader.messages(&folder) {
                Ok(messages) => {
                    for message in &messages {
                        match self.convert(reader, message, source) {
                            Ok(record) => {
                                out.push(record);
                                stats.converted += 1;
                            }
                            Err(e) => {
                                warn!(
                                    path = %source.display(),
                                    folder = %name,
                                    kind = %e.kind(),
                                    error = %e,
                                    "Dropping archive message"
                                );
                                stats.dropped += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(path = %source.display(), folder = %name, error = %e, "Cannot list folder messages");
                }
            }

            if depth >= MAX_FOLDER_DEPTH {
                warn!(path = %source.display(), folder = %name, "Folder tree too deep, not descending");
                continue;
            }
            match reader.subfolders(&folder) {
                Ok(children) => {
                    // Reversed so the first child is walked first.
                    stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
                }
                Err(e) => {
                    warn!(path = %source.display(), folder = %name, error = %e, "Cannot list subfolders");
                }
            }
        }

        Ok(stats)
    }

    fn convert(
        &self,
        reader: &B::Reader,
        message: &<B::Reader as ArchiveReader>::Message,
        source: &Path,
    ) -> Result<EmailRecord> {
        let raw = reader.to_rfc822(message)?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ScrubError::malformed(source, "archive message serialized to nothing"));
        }
        let loose = mime::force_plain_text(&raw);
        let mut record = self.eml.parse_bytes(&loose, source)?;
        record.attachments = reader.attachments(message)?;
        Ok(record)
    }
}

impl<B: ArchiveBackend> FormatAdapter for PstAdapter<B> {
    fn format(&self) -> SourceFormat {
        SourceFormat::Pst
    }

    fn parse_one(&self, source: &Path) -> Result<Vec<EmailRecord>> {
        self.parse_archive(source).map(|(records, _)| records)
    }
}
