//! Centralized error types for mailscrub.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailscrub library.
#[derive(Error, Debug)]
pub enum ScrubError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file extension does not map to any known source format.
    #[error("Unsupported file type: .{0}")]
    UnsupportedFormat(String),

    /// A single message could not be decoded.
    #[error("Malformed message in '{path}': {reason}")]
    MalformedMessage { path: PathBuf, reason: String },

    /// A whole archive could not be read.
    #[error("Archive '{path}' could not be read: {reason}")]
    ArchiveFailure { path: PathBuf, reason: String },

    /// Missing or invalid input/output configuration. Aborts the run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The name dictionary could not be loaded.
    #[error("Name dictionary '{path}' could not be loaded: {reason}")]
    Dictionary { path: PathBuf, reason: String },

    /// Writing output artifacts failed.
    #[error("Export error: {0}")]
    Export(String),
}

/// Convenience alias for `Result<T, ScrubError>`.
pub type Result<T> = std::result::Result<T, ScrubError>;

/// Coarse classification used for log fields and drop tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    MalformedMessage,
    ArchiveFailure,
    ConfigurationError,
    Io,
    Export,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::MalformedMessage => "MalformedMessage",
            Self::ArchiveFailure => "ArchiveFailure",
            Self::ConfigurationError => "ConfigurationError",
            Self::Io => "Io",
            Self::Export => "Export",
        };
        f.write_str(name)
    }
}

impl ScrubError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `MalformedMessage` variant.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an `ArchiveFailure` variant.
    pub fn archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArchiveFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The error's classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::MalformedMessage { .. } => ErrorKind::MalformedMessage,
            Self::ArchiveFailure { .. } => ErrorKind::ArchiveFailure,
            Self::Configuration(_) | Self::Dictionary { .. } => ErrorKind::ConfigurationError,
            Self::Export(_) => ErrorKind::Export,
        }
    }

    /// `true` for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConfigurationError | ErrorKind::Export)
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `ScrubError::io`).
impl From<std::io::Error> for ScrubError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
