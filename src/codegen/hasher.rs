//! BLAKE3 content hashing for generated files.

use crate::error::{Error, Result};
use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Hash a file's contents. Returns `"blake3:{hex}"`.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; STREAM_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_string_hashes_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("struct1.rs");
        std::fs::write(&path, "pub struct Struct1;").unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_string("pub struct Struct1;"));
    }

    #[test]
    fn test_hash_format() {
        let h = hash_string("");
        assert!(h.starts_with("blake3:"));
        assert_eq!(h.len(), "blake3:".len() + 64);
        assert_ne!(h, hash_string(" "));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(hash_file(Path::new("/nonexistent/x.rs")), Err(Error::Io { .. })));
    }
}
