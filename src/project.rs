//! Grouping of input files into named projects.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, ScrubError};

/// A named batch of source files sharing one address-hash table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

impl Project {
    /// Enumerate every regular file below `dir`, sorted by path.
    ///
    /// The project is named after the directory's last component.
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ScrubError::Configuration(format!(
                "project directory does not exist: {}",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                match e.into_io_error() {
                    Some(source) => ScrubError::io(path, source),
                    None => ScrubError::Configuration(format!(
                        "cannot walk {}: filesystem loop",
                        path.display()
                    )),
                }
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        let name = project_name(dir);
        debug!(project = %name, files = files.len(), "Project discovered");
        Ok(Self {
            name,
            root: dir.to_path_buf(),
            files,
        })
    }
}

/// Read project directories from a list file: one per line, blank lines
/// and `#` comments ignored. Relative entries resolve against the list
/// file's directory.
pub fn read_project_list(list: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(list).map_err(|e| {
        ScrubError::Configuration(format!("cannot read project list {}: {e}", list.display()))
    })?;
    let base = list.parent().unwrap_or(Path::new(""));

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let path = PathBuf::from(line);
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        })
        .collect())
}

fn project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
