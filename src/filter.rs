use std::collections::BTreeSet;
use std::ffi::OsStr;

/// Names excluded from scanning unless configured otherwise: version
/// control bookkeeping, OS metadata files, and the manifest store's own
/// default directory.
pub const DEFAULT_EXCLUDED_NAMES: &[&str] =
    &[".git", ".hg", ".svn", ".DS_Store", "Thumbs.db", ".bitrot"];

/// Decides which file and directory names are skipped while scanning.
///
/// Matching is by exact path segment, never by substring: excluding `.git`
/// skips any file or directory named `.git` at any depth, but not a file
/// named `.gitignore`. An excluded directory is pruned without descending
/// into it.
#[derive(Debug, Clone)]
pub struct PathFilter {
    excluded: BTreeSet<String>,
}

impl PathFilter {
    /// Creates a filter excluding exactly the given names. Defaults are not
    /// implied; include [`DEFAULT_EXCLUDED_NAMES`] if they are wanted.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathFilter {
            excluded: names.into_iter().map(Into::into).collect(),
        }
    }

    /// True if a single path segment matches the exclusion set. Names that
    /// are not valid Unicode never match.
    pub fn is_excluded_name(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| self.excluded.contains(n))
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_NAMES.iter().copied())
    }
}
