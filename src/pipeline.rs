//! Per-project orchestration: dispatch sources to adapters, then run the
//! privacy passes over the whole project batch.
//!
//! Adapter calls fan out over a rayon pool, one task per source file, and
//! are joined back in file order before pseudonymization so record
//! numbering and hash assignment do not depend on scheduling.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::anonymize::{pseudonymize, NameDictionary, NameRedactor};
use crate::error::{ErrorKind, Result, ScrubError};
use crate::model::hash_table::AddressHashTable;
use crate::model::record::EmailRecord;
use crate::parser::eml::EmlAdapter;
use crate::parser::msg::MsgAdapter;
use crate::parser::pst::{PstAdapter, ReadpstBackend};
use crate::parser::{FormatAdapter, SourceFormat, DEFAULT_MAX_NESTING_DEPTH};
use crate::project::Project;

/// Tuning knobs for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Worker threads for adapter calls (0 = one per CPU).
    pub jobs: usize,
    /// Bound on message-within-message recursion.
    pub max_nesting_depth: usize,
    /// Program used to extract `.pst` archives.
    pub readpst_path: PathBuf,
    /// Reproduce the historical leading space in redacted text.
    pub legacy_leading_space: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            jobs: 0,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            readpst_path: PathBuf::from(crate::parser::pst::readpst::DEFAULT_READPST),
            legacy_leading_space: false,
        }
    }
}

/// Lifecycle of a message through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStage {
    Raw,
    Parsed,
    Pseudonymized,
    Redacted,
    Emitted,
    /// Terminal: the source yielded no record.
    Dropped,
}

/// Why a source contributed no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    UnsupportedFormat,
    MalformedMessage,
    ArchiveFailure,
    /// The adapter succeeded but found no messages.
    Empty,
}

impl From<ErrorKind> for DropReason {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::UnsupportedFormat => Self::UnsupportedFormat,
            ErrorKind::ArchiveFailure => Self::ArchiveFailure,
            _ => Self::MalformedMessage,
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnsupportedFormat => "unsupported format",
            Self::MalformedMessage => "malformed message",
            Self::ArchiveFailure => "archive failure",
            Self::Empty => "no messages",
        };
        f.write_str(name)
    }
}

/// Counters for one processed project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectStats {
    pub files: usize,
    pub records_parsed: usize,
    pub records_emitted: usize,
    pub drops: BTreeMap<DropReason, usize>,
}

impl ProjectStats {
    pub fn dropped(&self, reason: DropReason) -> usize {
        self.drops.get(&reason).copied().unwrap_or(0)
    }

    /// Drops that indicate a real failure (unsupported and empty sources excluded).
    pub fn failures(&self) -> usize {
        self.dropped(DropReason::MalformedMessage) + self.dropped(DropReason::ArchiveFailure)
    }
}

/// A finished project, ready for export.
#[derive(Debug, Clone, Default)]
pub struct ProjectOutput {
    pub name: String,
    pub table: AddressHashTable,
    pub records: Vec<EmailRecord>,
    pub stats: ProjectStats,
}

/// Progress callback: `(sources_done, sources_total)`.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Dispatches sources to format adapters and applies the privacy passes.
pub struct Pipeline {
    adapters: HashMap<SourceFormat, Box<dyn FormatAdapter>>,
    redactor: NameRedactor,
    pool: rayon::ThreadPool,
}

impl Pipeline {
    /// Build a pipeline with the default EML, MSG and PST adapters.
    pub fn new(dictionary: Arc<NameDictionary>, options: &PipelineOptions) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .thread_name(|i| format!("mailscrub-worker-{i}"))
            .build()
            .map_err(|e| ScrubError::Configuration(format!("worker pool: {e}")))?;

        let depth = options.max_nesting_depth;
        let pipeline = Self {
            adapters: HashMap::new(),
            redactor: NameRedactor::new(dictionary)
                .with_legacy_leading_space(options.legacy_leading_space),
            pool,
        };
        Ok(pipeline
            .with_adapter(Box::new(EmlAdapter::new(depth)))
            .with_adapter(Box::new(MsgAdapter::new(depth)))
            .with_adapter(Box::new(PstAdapter::new(
                ReadpstBackend::new(&options.readpst_path),
                EmlAdapter::new(depth),
            ))))
    }

    /// Register an adapter, replacing any existing one for the same format.
    pub fn with_adapter(mut self, adapter: Box<dyn FormatAdapter>) -> Self {
        self.adapters.insert(adapter.format(), adapter);
        self
    }

    /// Run one project through parse, pseudonymize and redact.
    pub fn process_project(&self, project: &Project, progress: Option<ProgressFn<'_>>) -> ProjectOutput {
        self.process_files(&project.name, &project.files, progress)
    }

    /// Run an explicit list of source files as one project.
    pub fn process_files(
        &self,
        name: &str,
        files: &[PathBuf],
        progress: Option<ProgressFn<'_>>,
    ) -> ProjectOutput {
        let total = files.len();
        let done = AtomicUsize::new(0);
        info!(project = %name, files = total, "Processing project");

        let outcomes: Vec<std::result::Result<Vec<EmailRecord>, DropReason>> =
            self.pool.install(|| {
                files
                    .par_iter()
                    .map(|path| {
                        let outcome = self.parse_source(path);
                        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Some(cb) = progress {
                            cb(n, total);
                        }
                        outcome
                    })
                    .collect()
            });

        let mut stats = ProjectStats {
            files: total,
            ..Default::default()
        };
        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(parsed) => records.extend(parsed),
                Err(reason) => *stats.drops.entry(reason).or_insert(0) += 1,
            }
        }
        stats.records_parsed = records.len();
        debug!(project = %name, stage = ?MessageStage::Parsed, records = records.len());

        let (table, records) = pseudonymize(records);
        debug!(project = %name, stage = ?MessageStage::Pseudonymized, addresses = table.len());

        let records = self.redactor.redact(records);
        debug!(project = %name, stage = ?MessageStage::Redacted, records = records.len());

        stats.records_emitted = records.len();
        info!(
            project = %name,
            records = stats.records_emitted,
            addresses = table.len(),
            failures = stats.failures(),
            "Project processed"
        );

        ProjectOutput {
            name: name.to_string(),
            table,
            records,
            stats,
        }
    }

    /// Parse one source, turning every failure into a logged drop.
    fn parse_source(&self, path: &Path) -> std::result::Result<Vec<EmailRecord>, DropReason> {
        debug!(path = %path.display(), stage = ?MessageStage::Raw);

        let Some(adapter) = SourceFormat::from_path(path).and_then(|f| self.adapters.get(&f))
        else {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            let err = ScrubError::UnsupportedFormat(ext);
            warn!(path = %path.display(), kind = %err.kind(), "{err}, skipping");
            return Err(DropReason::UnsupportedFormat);
        };

        match adapter.parse_one(path) {
            Ok(records) if records.is_empty() => {
                warn!(path = %path.display(), stage = ?MessageStage::Dropped, "Source contained no messages");
                Err(DropReason::Empty)
            }
            Ok(records) => {
                debug!(path = %path.display(), records = records.len(), "Source parsed");
                Ok(records)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    kind = %e.kind(),
                    stage = ?MessageStage::Dropped,
                    error = %e,
                    "Dropping source"
                );
                Err(DropReason::from(e.kind()))
            }
        }
    }
}
