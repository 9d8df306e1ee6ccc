//! Archive backend that extracts `.pst` files with libpst's `readpst`.
//!
//! `readpst -S` writes each folder as a directory, each message as a file
//! named by its number inside the folder, and each attachment as a sibling
//! file named `<number>-<filename>`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;
use walkdir::WalkDir;

use super::{ArchiveBackend, ArchiveReader};
use crate::error::{Result, ScrubError};
use crate::model::attachment::AttachmentMeta;

/// Name of the extraction tool looked up on `PATH` by default.
pub const DEFAULT_READPST: &str = "readpst";

/// Runs `readpst` into the scratch directory.
#[derive(Debug, Clone)]
pub struct ReadpstBackend {
    program: PathBuf,
}

impl ReadpstBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for ReadpstBackend {
    fn default() -> Self {
        Self::new(DEFAULT_READPST)
    }
}

impl ArchiveBackend for ReadpstBackend {
    type Reader = ExtractedArchive;

    fn open(&self, archive: &Path, scratch: &Path) -> Result<ExtractedArchive> {
        debug!(program = %self.program.display(), archive = %archive.display(), "Running readpst");
        let output = Command::new(&self.program)
            .arg("-q")
            .arg("-b")
            .arg("-S")
            .arg("-o")
            .arg(scratch)
            .arg(archive)
            .output()
            .map_err(|e| {
                ScrubError::archive(
                    archive,
                    format!("cannot run {}: {e}", self.program.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScrubError::archive(
                archive,
                format!("readpst exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(ExtractedArchive::new(scratch))
    }
}

/// One message file inside an extracted folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub path: PathBuf,
    pub number: u64,
}

/// A folder tree laid out on disk by `readpst -S`.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    root: PathBuf,
}

impl ExtractedArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Direct children of `dir`, sorted by file name.
    fn entries(&self, dir: &Path) -> Result<Vec<walkdir::DirEntry>> {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| entry.map_err(|e| ScrubError::archive(dir, e.to_string())))
            .collect()
    }
}

/// Message number for a file called `N` or `N.eml`.
fn message_number(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(".eml").unwrap_or(name);
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

impl ArchiveReader for ExtractedArchive {
    type Folder = PathBuf;
    type Message = ExtractedMessage;

    fn root(&self) -> Result<PathBuf> {
        if !self.root.is_dir() {
            return Err(ScrubError::archive(&self.root, "extraction directory missing"));
        }
        Ok(self.root.clone())
    }

    fn folder_name(&self, folder: &PathBuf) -> String {
        folder
            .strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| folder.display().to_string())
    }

    fn subfolders(&self, folder: &PathBuf) -> Result<Vec<PathBuf>> {
        Ok(self
            .entries(folder)?
            .into_iter()
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect())
    }

    fn messages(&self, folder: &PathBuf) -> Result<Vec<ExtractedMessage>> {
        let mut messages: Vec<ExtractedMessage> = self
            .entries(folder)?
            .into_iter()
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let number = message_number(e.file_name().to_str()?)?;
                Some(ExtractedMessage {
                    path: e.into_path(),
                    number,
                })
            })
            .collect();
        messages.sort_by_key(|m| m.number);
        Ok(messages)
    }

    fn to_rfc822(&self, message: &ExtractedMessage) -> Result<Vec<u8>> {
        std::fs::read(&message.path).map_err(|e| ScrubError::io(&message.path, e))
    }

    fn attachments(&self, message: &ExtractedMessage) -> Result<Vec<AttachmentMeta>> {
        let Some(dir) = message.path.parent() else {
            return Ok(Vec::new());
        };
        let prefix = format!("{}-", message.number);

        let mut out = Vec::new();
        for entry in self.entries(dir)? {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(filename) = name.strip_prefix(&prefix) else {
                continue;
            };
            let size = entry
                .metadata()
                .map_err(|e| ScrubError::archive(entry.path(), e.to_string()))?
                .len();
            let filename = if filename.is_empty() {
                AttachmentMeta::fallback_name(out.len())
            } else {
                filename.to_string()
            };
            out.push(AttachmentMeta::new(filename, size));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extracted_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let inbox = dir.path().join("Personal Folders").join("Inbox");
        let sent = dir.path().join("Personal Folders").join("Sent Items");
        fs::create_dir_all(&inbox).expect("mkdir");
        fs::create_dir_all(&sent).expect("mkdir");

        fs::write(inbox.join("2"), "Subject: second\n\nb\n").expect("write");
        fs::write(inbox.join("10"), "Subject: tenth\n\nc\n").expect("write");
        fs::write(inbox.join("1.eml"), "Subject: first\n\na\n").expect("write");
        fs::write(inbox.join("1-report.pdf"), [0u8; 42]).expect("write");
        fs::write(inbox.join("10-notes.txt"), "xyz").expect("write");
        fs::write(sent.join("1"), "Subject: sent\n\nd\n").expect("write");
        dir
    }

    #[test]
    fn test_message_number() {
        assert_eq!(message_number("12"), Some(12));
        assert_eq!(message_number("3.eml"), Some(3));
        assert_eq!(message_number("3-file.txt"), None);
        assert_eq!(message_number(".eml"), None);
        assert_eq!(message_number("mbox"), None);
    }

    #[test]
    fn test_extracted_tree_layout() {
        let dir = extracted_tree();
        let archive = ExtractedArchive::new(dir.path());

        let root = archive.root().expect("root");
        let top = archive.subfolders(&root).expect("subfolders");
        assert_eq!(top.len(), 1);
        let folders = archive.subfolders(&top[0]).expect("subfolders");
        let names: Vec<String> = folders.iter().map(|f| archive.folder_name(f)).collect();
        assert_eq!(
            names,
            vec![
                Path::new("Personal Folders").join("Inbox").display().to_string(),
                Path::new("Personal Folders").join("Sent Items").display().to_string(),
            ]
        );

        let messages = archive.messages(&folders[0]).expect("messages");
        let numbers: Vec<u64> = messages.iter().map(|m| m.number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);

        let first = archive.attachments(&messages[0]).expect("attachments");
        assert_eq!(first, vec![AttachmentMeta::new("report.pdf", 42)]);
        let tenth = archive.attachments(&messages[2]).expect("attachments");
        assert_eq!(tenth, vec![AttachmentMeta::new("notes.txt", 3)]);
        assert!(archive.attachments(&messages[1]).expect("attachments").is_empty());

        let raw = archive.to_rfc822(&messages[0]).expect("read");
        assert!(raw.starts_with(b"Subject: first"));
    }

    #[test]
    fn test_missing_program_is_archive_failure() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let backend = ReadpstBackend::new("/nonexistent/bin/readpst-missing");
        let err = backend
            .open(Path::new("box.pst"), scratch.path())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ArchiveFailure);
    }
}
