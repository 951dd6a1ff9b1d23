//! Lock file management: load, save (atomic), path derivation.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = "structs.lock.yaml";

/// Hashes of the files written by the last `generate` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructLock {
    pub schema: String,
    pub generator: String,
    pub max_arity: usize,
    /// File name to `"blake3:{hex}"`, in generation order
    pub files: IndexMap<String, String>,
}

impl StructLock {
    pub fn new(max_arity: usize) -> Self {
        StructLock {
            schema: "1.0".to_string(),
            generator: format!("immutable-collections {}", env!("CARGO_PKG_VERSION")),
            max_arity,
            files: IndexMap::new(),
        }
    }
}

pub fn lock_file_path(out_dir: &Path) -> PathBuf {
    out_dir.join(LOCK_FILE)
}

/// Load the lock of `out_dir`. Returns None if the file doesn't exist.
pub fn load_lock(out_dir: &Path) -> Result<Option<StructLock>> {
    let path = lock_file_path(out_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let lock: StructLock = serde_yaml_ng::from_str(&content)?;
    Ok(Some(lock))
}

/// Save the lock atomically (write to temp, then rename).
pub fn save_lock(out_dir: &Path, lock: &StructLock) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
    let path = lock_file_path(out_dir);
    let yaml = serde_yaml_ng::to_string(lock)?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml).map_err(|e| Error::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| Error::io(&path, e))?;
    Ok(())
}
