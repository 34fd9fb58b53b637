use assert_cmd::{Command, cargo::cargo_bin_cmd};
use filetime::{FileTime, set_file_mtime};
use std::path::Path;

/// Command with the manifest store rooted at `store`, keeping each test
/// isolated from the user's real store and from other tests. Ambient
/// RUST_LOG is dropped so log assertions see only what the test sets.
pub fn bitrot_cmd(store: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("bitrot");
    cmd.env("BITROT_STORE", store);
    cmd.env_remove("RUST_LOG");
    cmd
}

// Each integration test file is compiled as its own crate. Not every crate
// uses every helper below, so they are marked to avoid dead code warnings.

/// Flips a byte of the file while restoring its modification time, which is
/// what silent corruption looks like to a scan.
#[allow(dead_code)]
pub fn corrupt_file(path: &Path) {
    let metadata = std::fs::metadata(path).expect("corrupt_file: stat");
    let mtime = FileTime::from_last_modification_time(&metadata);

    let mut content = std::fs::read(path).expect("corrupt_file: read");
    content[0] ^= 0xff;
    std::fs::write(path, &content).expect("corrupt_file: write");

    set_file_mtime(path, mtime).expect("corrupt_file: restore mtime");
}

/// Writes a file and pins its modification time, so two trees can carry
/// identical timestamps.
#[allow(dead_code)]
pub fn write_with_mtime(path: &Path, content: &str, unix_secs: i64) {
    std::fs::write(path, content).expect("write_with_mtime: write");
    set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0))
        .expect("write_with_mtime: set mtime");
}

/// Number of manifest files across all entries of the store.
#[allow(dead_code)]
pub fn manifest_count(store: &Path) -> usize {
    let mut count = 0;
    let Ok(read_dir) = std::fs::read_dir(store) else {
        return 0;
    };
    for entry in read_dir {
        let entry = entry.expect("manifest_count: read store root");
        if !entry.file_type().expect("manifest_count: file type").is_dir() {
            continue;
        }
        for file in std::fs::read_dir(entry.path()).expect("manifest_count: read entry") {
            let name = file.expect("manifest_count: read file").file_name();
            if name.to_string_lossy().starts_with("manifest-") {
                count += 1;
            }
        }
    }
    count
}
