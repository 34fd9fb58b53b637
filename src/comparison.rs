use crate::manifest::Manifest;
use std::collections::BTreeSet;

/// A path whose content survived unchanged under a new name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenamedPath {
    pub old_path: String,
    pub new_path: String,
}

/// Classification of every path across two manifests of the same tree.
///
/// Each path present in either manifest lands in exactly one category; a
/// rename accounts for both its old and new path. The categories:
///
/// - added: present only in the new manifest, content matches no deleted path
/// - deleted: present only in the old manifest, content matches no added path
/// - renamed: disappeared from one path and appeared at another with the
///   same checksum
/// - modified: checksum changed and so did the modification time
/// - flagged: checksum changed but the modification time did not, which is
///   the signature of silent corruption
/// - unchanged: checksum identical, whatever the modification time did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestComparison {
    pub added_paths: BTreeSet<String>,
    pub deleted_paths: BTreeSet<String>,
    pub renamed_paths: BTreeSet<RenamedPath>,
    pub modified_paths: BTreeSet<String>,
    pub flagged_paths: BTreeSet<String>,
    pub unchanged_paths: BTreeSet<String>,
}

impl ManifestComparison {
    /// Compares two manifests, treating `old` as the baseline. Neither
    /// manifest is modified; the result is deterministic for a given pair
    /// of inputs.
    pub fn between(old: &Manifest, new: &Manifest) -> ManifestComparison {
        let mut added_paths: BTreeSet<String> = new
            .entries
            .keys()
            .filter(|path| !old.entries.contains_key(*path))
            .cloned()
            .collect();
        let mut deleted_paths = BTreeSet::new();
        let mut renamed_paths = BTreeSet::new();
        let mut modified_paths = BTreeSet::new();
        let mut flagged_paths = BTreeSet::new();
        let mut unchanged_paths = BTreeSet::new();

        for (path, old_record) in &old.entries {
            if let Some(new_record) = new.entries.get(path) {
                if new_record.checksum == old_record.checksum {
                    unchanged_paths.insert(path.clone());
                } else if new_record.mod_time == old_record.mod_time {
                    flagged_paths.insert(path.clone());
                } else {
                    modified_paths.insert(path.clone());
                }
            } else if let Some(new_path) = rename_target(&added_paths, new, &old_record.checksum) {
                added_paths.remove(&new_path);
                renamed_paths.insert(RenamedPath {
                    old_path: path.clone(),
                    new_path,
                });
            } else {
                deleted_paths.insert(path.clone());
            }
        }

        ManifestComparison {
            added_paths,
            deleted_paths,
            renamed_paths,
            modified_paths,
            flagged_paths,
            unchanged_paths,
        }
    }

    /// True when any path carries the silent corruption signature.
    pub fn has_flagged(&self) -> bool {
        !self.flagged_paths.is_empty()
    }

    /// True when the two manifests describe identical trees.
    pub fn is_unchanged(&self) -> bool {
        self.added_paths.is_empty()
            && self.deleted_paths.is_empty()
            && self.renamed_paths.is_empty()
            && self.modified_paths.is_empty()
            && self.flagged_paths.is_empty()
    }

    /// Number of distinct files accounted for; a rename counts once.
    pub fn total_paths(&self) -> usize {
        self.added_paths.len()
            + self.deleted_paths.len()
            + self.renamed_paths.len()
            + self.modified_paths.len()
            + self.flagged_paths.len()
            + self.unchanged_paths.len()
    }
}

/// Finds the rename destination for a vanished old path: the added path,
/// smallest in lexical order, whose new checksum matches. Picking the
/// smallest keeps the classification deterministic when several added
/// paths share the content.
fn rename_target(added: &BTreeSet<String>, new: &Manifest, checksum: &str) -> Option<String> {
    added
        .iter()
        .find(|path| {
            new.entries
                .get(*path)
                .is_some_and(|record| record.checksum == checksum)
        })
        .cloned()
}
