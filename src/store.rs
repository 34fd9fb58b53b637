use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File inside each store entry directory recording which monitored path
/// the directory belongs to.
pub const METADATA_FILENAME: &str = "bitrot_meta.json";

const MANIFEST_PREFIX: &str = "manifest-";
const MANIFEST_SUFFIX: &str = ".json";

/// Timestamp format embedded in manifest file names. Chosen so that
/// lexical order of file names equals chronological order.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Malformed JSON in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Store entry {metadata_path} belongs to {recorded}, not {requested}")]
    PathMismatch {
        metadata_path: PathBuf,
        recorded: String,
        requested: String,
    },
    #[error("Manifest already exists: {0}")]
    AlreadyExists(PathBuf),
}

/// Per-entry marker file contents. The capitalized field name is part of
/// the on-disk format; existing stores depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreMetadata {
    #[serde(rename = "Path")]
    path: String,
}

/// One monitored path known to the store, with its manifest file names in
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub path: String,
    pub id: String,
    pub manifests: Vec<String>,
}

/// On-disk collection of manifests, one subdirectory per monitored path.
///
/// The subdirectory name is the SHA-256 of the monitored path, which keeps
/// names filesystem-safe and of fixed length no matter how long or strange
/// the monitored path is. Each subdirectory holds a metadata marker naming
/// the path it belongs to, plus any number of manifest files whose names
/// embed the creation timestamp and a checksum of the serialized bytes.
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ManifestStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store entry directory name for a monitored path.
    pub fn storage_key(path: &str) -> String {
        format!("{:x}", Sha256::digest(path.as_bytes()))
    }

    /// Creates the entry directory for `path` if needed and verifies its
    /// metadata marker. A marker naming a different path means two
    /// monitored paths collided on one entry directory, and the store
    /// refuses to touch it.
    pub fn ensure_entry(&self, path: &str) -> Result<PathBuf, StoreError> {
        let entry_dir = self.root.join(Self::storage_key(path));
        fs::create_dir_all(&entry_dir).map_err(|e| io_error(&entry_dir, e))?;

        let metadata_path = entry_dir.join(METADATA_FILENAME);
        match fs::read(&metadata_path) {
            Ok(bytes) => {
                let metadata: StoreMetadata =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                        path: metadata_path.clone(),
                        source: e,
                    })?;
                if metadata.path != path {
                    return Err(StoreError::PathMismatch {
                        metadata_path,
                        recorded: metadata.path,
                        requested: path.to_string(),
                    });
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let metadata = StoreMetadata {
                    path: path.to_string(),
                };
                let bytes =
                    serde_json::to_vec(&metadata).map_err(|e| StoreError::Serialization {
                        path: metadata_path.clone(),
                        source: e,
                    })?;
                write_atomically(&metadata_path, &bytes)?;
                debug!("Created store entry for {} at {}", path, entry_dir.display());
            }
            Err(e) => return Err(io_error(&metadata_path, e)),
        }

        Ok(entry_dir)
    }

    /// Writes `manifest` into the store and returns the path of the new
    /// manifest file. Refuses to overwrite an existing file of the same
    /// name, which can happen when two manifests of identical content are
    /// created within the same second.
    pub fn add_manifest(&self, manifest: &Manifest) -> Result<PathBuf, StoreError> {
        let entry_dir = self.ensure_entry(&manifest.path)?;

        // Serialize first: the file name embeds a checksum of the bytes.
        let bytes = serde_json::to_vec(manifest).map_err(|e| StoreError::Serialization {
            path: entry_dir.clone(),
            source: e,
        })?;
        let manifest_path = entry_dir.join(manifest_filename(manifest, &bytes));

        if manifest_path.exists() {
            return Err(StoreError::AlreadyExists(manifest_path));
        }

        write_atomically(&manifest_path, &bytes)?;
        info!("Stored manifest at {}", manifest_path.display());

        Ok(manifest_path)
    }

    /// Loads the most recent manifest stored for `path`, or `None` if the
    /// path has no manifests yet.
    pub fn latest_manifest_for(&self, path: &str) -> Result<Option<Manifest>, StoreError> {
        let entry_dir = self.ensure_entry(path)?;

        let mut names = manifest_names(&entry_dir)?;
        names.sort_unstable_by(|a, b| b.cmp(a));
        let Some(newest) = names.first() else {
            return Ok(None);
        };

        let manifest_path = entry_dir.join(newest);
        debug!("Loading manifest from {}", manifest_path.display());
        let bytes = fs::read(&manifest_path).map_err(|e| io_error(&manifest_path, e))?;
        let manifest =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                path: manifest_path.clone(),
                source: e,
            })?;

        Ok(Some(manifest))
    }

    /// Lists every monitored path in the store, ordered by path.
    pub fn list(&self) -> Result<Vec<StoreEntry>, StoreError> {
        let mut entries = Vec::new();

        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(io_error(&self.root, e)),
        };

        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(StoreError::Io)?;
            if !dir_entry.file_type().map_err(StoreError::Io)?.is_dir() {
                continue;
            }

            let entry_dir = dir_entry.path();
            let metadata_path = entry_dir.join(METADATA_FILENAME);
            let bytes = match fs::read(&metadata_path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Skipping store entry without metadata: {}", entry_dir.display());
                    continue;
                }
                Err(e) => return Err(io_error(&metadata_path, e)),
            };
            let metadata: StoreMetadata =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                    path: metadata_path.clone(),
                    source: e,
                })?;

            let mut manifests = manifest_names(&entry_dir)?;
            manifests.sort_unstable();

            entries.push(StoreEntry {
                path: metadata.path,
                id: dir_entry.file_name().to_string_lossy().into_owned(),
                manifests,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

/// File name for a manifest: creation timestamp for ordering plus a CRC-32
/// of the serialized bytes to distinguish snapshots from the same second.
fn manifest_filename(manifest: &Manifest, serialized: &[u8]) -> String {
    format!(
        "{}{}-{:08x}{}",
        MANIFEST_PREFIX,
        manifest.created_at.format(TIMESTAMP_FORMAT),
        crc32fast::hash(serialized),
        MANIFEST_SUFFIX
    )
}

/// Manifest file names within one entry directory, unordered. Other names
/// (the metadata marker, leftover temp files) are ignored.
fn manifest_names(entry_dir: &Path) -> Result<Vec<String>, StoreError> {
    let mut names = Vec::new();
    let read_dir = fs::read_dir(entry_dir).map_err(|e| io_error(entry_dir, e))?;
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(StoreError::Io)?;
        if let Some(name) = dir_entry.file_name().to_str()
            && name.starts_with(MANIFEST_PREFIX)
            && name.ends_with(MANIFEST_SUFFIX)
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Writes to a temporary file in the same directory, fsyncs it, then
/// atomically renames it into place.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or(Path::new("."));

    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| io_error(parent, e))?;
    temp_file
        .write_all(bytes)
        .map_err(|e| io_error(path, e))?;
    temp_file.as_file().sync_all().map_err(StoreError::Io)?;
    temp_file
        .persist(path)
        .map_err(|e| io_error(path, e.error))?;

    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        StoreError::PermissionDenied(path.to_path_buf())
    } else {
        StoreError::Io(e)
    }
}
