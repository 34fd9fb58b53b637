use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

/// Computes hex encoded SHA-1 checksums of file contents.
///
/// Files are read in fixed size chunks so memory use stays bounded by the
/// configured buffer size regardless of file size. The buffer size does not
/// affect the resulting digest.
#[derive(Debug, Clone)]
pub struct ChecksumEngine {
    buffer_size: usize,
}

impl ChecksumEngine {
    /// Read buffer size used when none is configured explicitly.
    pub const DEFAULT_BUFFER_SIZE: usize = 10 * 1024 * 1024;

    pub fn new() -> Self {
        Self::with_buffer_size(Self::DEFAULT_BUFFER_SIZE)
    }

    /// Creates an engine reading in chunks of `buffer_size` bytes. The size
    /// must be positive.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        debug_assert!(buffer_size > 0, "buffer size must be positive");
        ChecksumEngine { buffer_size }
    }

    /// Computes the checksum of the file at `path`.
    ///
    /// # Errors
    /// - `ChecksumError::Io`: File doesn't exist or other I/O errors
    /// - `ChecksumError::PermissionDenied`: Insufficient permissions to read the file
    pub fn digest_file(&self, path: &Path) -> Result<String, ChecksumError> {
        info!("Checksumming {}", path.display());

        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ChecksumError::PermissionDenied(path.to_path_buf())
            } else {
                ChecksumError::Io(e)
            }
        })?;
        let mut hasher = Sha1::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let bytes_read = file.read(&mut buffer).map_err(ChecksumError::Io)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        let digest = format!("{:x}", hasher.finalize());

        debug!("Checksum of {} is {}", path.display(), digest);

        Ok(digest)
    }
}

impl Default for ChecksumEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_digest_simple_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"hello! world\n").unwrap();
        temp_file.flush().unwrap();

        let digest = ChecksumEngine::new().digest_file(temp_file.path()).unwrap();

        assert_eq!(digest, "87b3fe7479c73ae4246dbe8081550f52e2cf9e59");
    }

    #[test]
    fn test_digest_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();

        let digest = ChecksumEngine::new().digest_file(temp_file.path()).unwrap();

        assert_eq!(digest, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_digest_large_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let content = vec![b'A'; 1024 * 1024];
        temp_file.write_all(&content).unwrap();
        temp_file.flush().unwrap();

        let digest = ChecksumEngine::new().digest_file(temp_file.path()).unwrap();

        assert_eq!(digest.len(), 40);
    }

    #[test]
    fn test_digest_independent_of_buffer_size() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = vec![b'Z'; 64 * 1024 + 17];
        temp_file.write_all(&content).unwrap();
        temp_file.flush().unwrap();

        let reference = ChecksumEngine::new().digest_file(temp_file.path()).unwrap();

        for buffer_size in [1, 13, 4096, content.len(), content.len() + 1] {
            let digest = ChecksumEngine::with_buffer_size(buffer_size)
                .digest_file(temp_file.path())
                .unwrap();
            assert_eq!(digest, reference, "buffer size {buffer_size}");
        }
    }

    #[test]
    fn test_digest_nonexistent_file() {
        let result = ChecksumEngine::new().digest_file(Path::new("/nonexistent/file.txt"));

        assert!(result.is_err());
        match result {
            Err(ChecksumError::Io(_)) => {}
            _ => panic!("Expected IO error for nonexistent file"),
        }
    }

    #[test]
    fn test_engine_reuse_is_deterministic() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"test content").unwrap();
        temp_file.flush().unwrap();

        let engine = ChecksumEngine::new();
        let first = engine.digest_file(temp_file.path()).unwrap();
        let second = engine.digest_file(temp_file.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    #[cfg(unix)]
    fn test_digest_permission_denied() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"test content").unwrap();
        temp_file.flush().unwrap();

        let mut perms = fs::metadata(temp_file.path()).unwrap().permissions();
        perms.set_mode(0o000);
        fs::set_permissions(temp_file.path(), perms).unwrap();

        if File::open(temp_file.path()).is_ok() {
            // Running as root; permission bits are not enforced.
            return;
        }

        let result = ChecksumEngine::new().digest_file(temp_file.path());

        assert!(result.is_err());
        match result {
            Err(ChecksumError::PermissionDenied(_)) => {}
            _ => panic!("Expected PermissionDenied error for permission denied"),
        }
    }
}
