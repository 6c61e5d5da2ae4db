use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

const BUFFER_SIZE: usize = 1024 * 1024; // 1MB buffer

/// SHA-256 of a finished report or side file.
///
/// Returns `None` when the path is not a regular file.
pub fn sha256_file(path: &Path) -> io::Result<Option<String>> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Some(format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_known_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.htm");
        std::fs::write(&path, b"abc").unwrap();

        let digest = sha256_file(&path).unwrap().unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_directory_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(sha256_file(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_sha256_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(sha256_file(&dir.path().join("missing")).is_err());
    }
}
