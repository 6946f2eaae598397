use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::random;

use crate::error::{IoContext, PackError, Result};

pub const TEMP_SUFFIX: &str = ".tmp";

/// Writes `data` to `path` so that readers either see the old file or the complete new one.
///
/// The bytes go to a hidden temp file in the same directory first, which is then renamed over
/// the destination. Rename within one directory is atomic on the filesystems we care about.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent()
        .ok_or_else(|| PackError::io(format!("No parent directory for {}", path.display()), io::ErrorKind::InvalidInput.into()))?;
    let tmp = temp_path_for(path);

    let written = write_and_sync(&tmp, data)
        .and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(PackError::io(format!("Failed to write {}", path.display()), e));
    }

    // persist the rename itself; not every platform lets us open a directory
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// Creates a directory and its parents. Already existing is fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .io_context(|| format!("Failed to create directory {}", path.display()))
}

/// Removes a directory tree, treating "not found" as success.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PackError::io(format!("Failed to remove {}", path.display()), e)),
    }
}

pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PackError::io(format!("Failed to remove {}", path.display()), e)),
    }
}

/// Reads a file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PackError::io(format!("Failed to read {}", path.display()), e)),
    }
}

pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n.ends_with(TEMP_SUFFIX))
        .unwrap_or(false)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{:016x}{}", name, random::<u64>(), TEMP_SUFFIX))
}

fn write_and_sync(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_replaces_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("index.json");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_temp_file(&e.path()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_atomic_fails_without_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("file.png");
        assert!(write_atomic(&target, b"x").is_err());
    }

    #[test]
    fn removals_ignore_missing() {
        let dir = TempDir::new().unwrap();
        assert!(!remove_dir_if_exists(&dir.path().join("nope")).unwrap());
        assert!(!remove_file_if_exists(&dir.path().join("nope.png")).unwrap());
        ensure_dir(&dir.path().join("a/b")).unwrap();
        ensure_dir(&dir.path().join("a/b")).unwrap();
        assert!(remove_dir_if_exists(&dir.path().join("a")).unwrap());
    }

    #[test]
    fn temp_names_are_recognised() {
        let tmp = temp_path_for(Path::new("/x/sprite.png"));
        assert!(is_temp_file(&tmp));
        assert!(!is_temp_file(Path::new("/x/sprite.png")));
    }
}
