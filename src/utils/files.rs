use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

/// Read a tool output file as text.
///
/// Upstream tools write a mix of UTF-8, UTF-16 fragments and raw bytes;
/// invalid sequences are replaced and NUL bytes dropped.
pub fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.replace('\0', ""))
}

/// Delete a file, treating "not found" as success
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Delete a directory tree, treating "not found" as success
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_lossy_strips_nul_and_bad_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, b"a\0b,\xffc\n").unwrap();

        let text = read_lossy(&path).unwrap();
        assert_eq!(text, "ab,\u{fffd}c\n");
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        remove_if_exists(&dir.path().join("absent")).unwrap();
        remove_dir_if_exists(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn test_remove_existing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        remove_if_exists(&file).unwrap();
        assert!(!file.exists());

        let sub = dir.path().join("sub").join("deeper");
        fs::create_dir_all(&sub).unwrap();
        remove_dir_if_exists(&dir.path().join("sub")).unwrap();
        assert!(!dir.path().join("sub").exists());
    }
}
