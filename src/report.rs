use crate::comparison::{ManifestComparison, RenamedPath};
use std::collections::BTreeSet;
use std::fmt;

/// Human readable rendering of a [`ManifestComparison`].
///
/// The first line is the verdict: `FAILURE` if any path carries the silent
/// corruption signature, `SUCCESS` otherwise. Every category is then shown
/// with its count; non-empty categories other than unchanged list their
/// paths one per line. Unchanged paths are counted but never listed, since
/// they would drown out the interesting ones on large trees.
pub struct ComparisonReport<'a> {
    comparison: &'a ManifestComparison,
}

impl<'a> ComparisonReport<'a> {
    pub fn new(comparison: &'a ManifestComparison) -> Self {
        ComparisonReport { comparison }
    }
}

impl fmt::Display for ComparisonReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comparison = self.comparison;

        let verdict = if comparison.has_flagged() {
            "FAILURE"
        } else {
            "SUCCESS"
        };
        writeln!(f, "{verdict}")?;
        writeln!(f)?;
        writeln!(f, "{} paths compared.", comparison.total_paths())?;
        writeln!(f)?;
        writeln!(f, "Unchanged paths: {}", comparison.unchanged_paths.len())?;
        write_path_section(f, "Added", &comparison.added_paths)?;
        write_path_section(f, "Deleted", &comparison.deleted_paths)?;
        write_renamed_section(f, &comparison.renamed_paths)?;
        write_path_section(f, "Modified", &comparison.modified_paths)?;
        write_path_section(f, "Flagged", &comparison.flagged_paths)?;

        Ok(())
    }
}

fn write_path_section(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    paths: &BTreeSet<String>,
) -> fmt::Result {
    if paths.is_empty() {
        return writeln!(f, "{label} paths: none");
    }
    writeln!(f, "{label} paths: {}", paths.len())?;
    for path in paths {
        writeln!(f, "    {path}")?;
    }
    Ok(())
}

fn write_renamed_section(f: &mut fmt::Formatter<'_>, renamed: &BTreeSet<RenamedPath>) -> fmt::Result {
    if renamed.is_empty() {
        return writeln!(f, "Renamed paths: none");
    }
    writeln!(f, "Renamed paths: {}", renamed.len())?;
    for rename in renamed {
        writeln!(f, "    {} -> {}", rename.old_path, rename.new_path)?;
    }
    Ok(())
}
