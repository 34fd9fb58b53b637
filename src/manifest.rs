use crate::checksum::{ChecksumEngine, ChecksumError};
use crate::filter::PathFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Path is not valid Unicode: {0}")]
    NonUnicodePath(PathBuf),
    #[error("Path not under the scanned root: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),
    #[error(transparent)]
    Checksum(#[from] ChecksumError),
}

/// Checksum and modification time captured for one regular file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChecksumRecord {
    /// Hex encoded SHA-1 of the file contents.
    pub checksum: String,
    /// Modification time observed when the file was checksummed, in UTC.
    pub mod_time: DateTime<Utc>,
}

/// Snapshot of every regular file under a directory at one point in time.
///
/// Entries are keyed by the path relative to the scanned root, with `/` as
/// the separator on every platform and the text normalized to Unicode NFC
/// so that the same tree produces the same keys on filesystems that store
/// names in decomposed form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Absolute path of the scanned directory.
    pub path: String,
    /// When the scan ran, in UTC.
    pub created_at: DateTime<Utc>,
    /// Relative path -> checksum record, ordered by key.
    pub entries: BTreeMap<String, ChecksumRecord>,
}

impl Manifest {
    /// Scans the directory tree rooted at `root` and records a checksum for
    /// every regular file not excluded by `filter`. Symbolic links are not
    /// followed; directories, links, and special files are not recorded.
    ///
    /// The walk fails on the first error rather than producing a partial
    /// manifest, since a manifest missing files would later be reported as
    /// deletions.
    pub fn build(
        root: &Path,
        filter: &PathFilter,
        engine: &ChecksumEngine,
    ) -> Result<Manifest, ManifestError> {
        let root = root.canonicalize().map_err(|e| io_error(root, e))?;
        if !root.is_dir() {
            return Err(ManifestError::NotADirectory(root));
        }
        let root_str = root
            .to_str()
            .ok_or_else(|| ManifestError::NonUnicodePath(root.clone()))?
            .to_string();

        info!("Building manifest for {}", root_str);

        let mut entries = BTreeMap::new();
        let walker = WalkDir::new(&root).follow_links(false).into_iter();
        // The root itself is always scanned even if its own name is in the
        // exclusion set; exclusions apply below it.
        for entry in
            walker.filter_entry(|e| e.depth() == 0 || !filter.is_excluded_name(e.file_name()))
        {
            let entry = entry.map_err(walk_error)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = entry.metadata().map_err(walk_error)?;
            let mod_time = metadata.modified().map_err(ManifestError::Io)?;
            let relative = relative_key(&root, entry.path())?;
            let checksum = engine.digest_file(entry.path())?;

            entries.insert(
                relative,
                ChecksumRecord {
                    checksum,
                    mod_time: mod_time.into(),
                },
            );
        }

        info!("Checksummed {} files under {}", entries.len(), root_str);

        Ok(Manifest {
            path: root_str,
            created_at: Utc::now(),
            entries,
        })
    }
}

/// Relative path of `path` under `root` as a `/`-separated, NFC normalized
/// string, suitable as a manifest entry key.
fn relative_key(root: &Path, path: &Path) -> Result<String, ManifestError> {
    let relative = path.strip_prefix(root)?;

    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ManifestError::NonUnicodePath(path.to_path_buf()))?;
        parts.push(part);
    }

    Ok(parts.join("/").nfc().collect())
}

fn io_error(path: &Path, e: std::io::Error) -> ManifestError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        ManifestError::PermissionDenied(path.to_path_buf())
    } else {
        ManifestError::Io(e)
    }
}

fn walk_error(e: walkdir::Error) -> ManifestError {
    let path = e.path().map(Path::to_path_buf);
    let io = std::io::Error::from(e);
    if io.kind() == std::io::ErrorKind::PermissionDenied
        && let Some(path) = path
    {
        ManifestError::PermissionDenied(path)
    } else {
        ManifestError::Io(io)
    }
}
