//! Output collaborator: writes one run directory holding a subdirectory per
//! project, each with the address-hash table and one JSON file per record.

pub mod csv;
pub mod json;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Result, ScrubError};
use crate::pipeline::ProjectOutput;

/// File name of the per-project address-hash table.
pub const HASH_TABLE_FILE: &str = "email-hashes.csv";

/// Prefix of the timestamped run directory.
pub const RUN_DIR_PREFIX: &str = "email-parser-output-";

/// How the run directory is laid out.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Create `email-parser-output-<timestamp>` under the output root
    /// instead of writing project directories into it directly.
    pub timestamped_run_dir: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            timestamped_run_dir: true,
        }
    }
}

/// Name of the run directory for a run started at `now`.
pub fn run_dir_name(now: DateTime<Utc>) -> String {
    format!("{RUN_DIR_PREFIX}{}", now.format("%m-%d-%Y--%H-%M-%S"))
}

/// Write every finished project under `output_root`. Returns the run directory.
pub fn write_run(
    output_root: &Path,
    projects: &[ProjectOutput],
    options: &ExportOptions,
) -> Result<PathBuf> {
    if !output_root.is_dir() {
        return Err(ScrubError::Configuration(format!(
            "output directory does not exist: {}",
            output_root.display()
        )));
    }

    let run_dir = if options.timestamped_run_dir {
        let dir = output_root.join(run_dir_name(Utc::now()));
        std::fs::create_dir(&dir).map_err(|e| ScrubError::io(&dir, e))?;
        dir
    } else {
        output_root.to_path_buf()
    };

    let mut used = HashSet::new();
    for project in projects {
        let dir = run_dir.join(unique_name(&project.name, &mut used));
        write_project(&dir, project)?;
    }

    info!(path = %run_dir.display(), projects = projects.len(), "Run written");
    Ok(run_dir)
}

/// Write one project's table and records into `dir`, creating it.
pub fn write_project(dir: &Path, project: &ProjectOutput) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| ScrubError::io(dir, e))?;
    csv::write_hash_table(&project.table, &dir.join(HASH_TABLE_FILE))?;
    for (index, record) in project.records.iter().enumerate() {
        json::write_record(record, &dir.join(json::record_file_name(index)))?;
    }
    info!(
        project = %project.name,
        path = %dir.display(),
        records = project.records.len(),
        addresses = project.table.len(),
        "Project written"
    );
    Ok(())
}

/// Project directory names, suffixed `-2`, `-3`, ... on collision.
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 1;
    while !used.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{name}-{n}");
    }
    candidate
}
