//! First-name / last-name dictionary used by the redactor.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::error::{Result, ScrubError};

/// Characters ignored when comparing a token against the dictionary.
const LOOKUP_PUNCTUATION: [char; 6] = ['.', ',', '!', '?', '\'', '"'];

/// The form a token or dictionary entry is compared in.
fn lookup_form(token: &str) -> String {
    token.replace(LOOKUP_PUNCTUATION, "").to_lowercase()
}

/// Read-only name lookup, loaded once and shared across workers.
///
/// Lookups are case-insensitive and ignore `. , ! ? ' "`.
#[derive(Debug, Clone, Default)]
pub struct NameDictionary {
    first: HashSet<String>,
    last: HashSet<String>,
}

impl NameDictionary {
    /// An empty dictionary: nothing is redacted.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dictionary from in-memory name lists.
    pub fn from_names<F, L>(first: F, last: L) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        Self {
            first: normalize(first),
            last: normalize(last),
        }
    }

    /// Load name lists from text files with one name per line.
    ///
    /// Blank lines and lines starting with `#` are ignored. Either path may
    /// be omitted, but not both, and the lists must hold at least one name:
    /// running without a dictionary would leave every name in place.
    pub fn load(first: Option<&Path>, last: Option<&Path>) -> Result<Self> {
        if first.is_none() && last.is_none() {
            return Err(ScrubError::Configuration(
                "no name dictionary configured (pass --first-names/--last-names or set [names] in the config)"
                    .to_string(),
            ));
        }

        let dict = Self {
            first: first.map(read_list).transpose()?.unwrap_or_default(),
            last: last.map(read_list).transpose()?.unwrap_or_default(),
        };
        if dict.is_empty() {
            return Err(ScrubError::Configuration(
                "name dictionary files contain no names".to_string(),
            ));
        }

        info!(
            first_names = dict.first.len(),
            last_names = dict.last.len(),
            "Name dictionary loaded"
        );
        Ok(dict)
    }

    pub fn is_first_name(&self, token: &str) -> bool {
        let key = lookup_form(token);
        !key.is_empty() && self.first.contains(&key)
    }

    pub fn is_last_name(&self, token: &str) -> bool {
        let key = lookup_form(token);
        !key.is_empty() && self.last.contains(&key)
    }

    /// `true` if `token` is either a first or a last name.
    pub fn is_name(&self, token: &str) -> bool {
        self.is_first_name(token) || self.is_last_name(token)
    }

    pub fn len(&self) -> usize {
        self.first.len() + self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.last.is_empty()
    }
}

fn normalize<I>(names: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty() && !n.starts_with('#'))
        .map(|n| lookup_form(&n))
        .filter(|n| !n.is_empty())
        .collect()
}

fn read_list(path: &Path) -> Result<HashSet<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| ScrubError::Dictionary {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(normalize(text.lines()))
}
