//! Generator configuration (`structs.yaml`) and runtime tuning.
//!
//! Parses the generator config and validates structural constraints:
//! - Version must be "1.0"
//! - `max_arity` must lie in 1..=32
//! - `out_dir` must not be empty

use crate::codegen::render::{EXTERN_TRAIT_PATH, MAX_STRUCT_ARITY};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest arity the generator accepts.
pub const ARITY_LIMIT: usize = 32;

/// Environment variable overriding the worker count of the sync helpers.
pub const PARALLELISM_VAR: &str = "PARALLELISM";

/// Root config of the struct generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Structs `Struct0..Struct{max_arity-1}` are generated
    #[serde(default = "default_max_arity")]
    pub max_arity: usize,

    /// Directory receiving `struct{N}.rs`, `mod.rs` and the lock file
    pub out_dir: PathBuf,

    /// Comment lines placed at the top of every generated file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,

    /// Path of the `Struct` trait in the generated impls
    #[serde(default = "default_trait_path")]
    pub trait_path: String,
}

fn default_max_arity() -> usize {
    MAX_STRUCT_ARITY
}

fn default_trait_path() -> String {
    EXTERN_TRAIT_PATH.to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            version: "1.0".to_string(),
            max_arity: MAX_STRUCT_ARITY,
            out_dir: PathBuf::from("src/structs"),
            header: None,
            trait_path: default_trait_path(),
        }
    }
}

impl GeneratorConfig {
    /// Resolve a relative `out_dir` against the directory holding the config.
    pub fn rebase(mut self, config_dir: &Path) -> Self {
        if self.out_dir.is_relative() {
            self.out_dir = config_dir.join(&self.out_dir);
        }
        self
    }
}

/// Validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a `structs.yaml` file from disk; a relative `out_dir` is taken
/// relative to the file.
pub fn parse_config_file(path: &Path) -> Result<GeneratorConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let config = parse_config(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.rebase(base))
}

/// Parse a generator config from a string.
pub fn parse_config(yaml: &str) -> Result<GeneratorConfig> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &GeneratorConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    if !(1..=ARITY_LIMIT).contains(&config.max_arity) {
        errors.push(ValidationError {
            message: format!(
                "max_arity must be between 1 and {}, got {}",
                ARITY_LIMIT, config.max_arity
            ),
        });
    }

    if config.out_dir.as_os_str().is_empty() {
        errors.push(ValidationError {
            message: "out_dir must not be empty".to_string(),
        });
    }

    if config.trait_path.trim().is_empty() {
        errors.push(ValidationError {
            message: "trait_path must not be empty".to_string(),
        });
    }

    errors
}

/// Parse and validate in one step, folding validation errors into one.
pub fn load_config(path: &Path) -> Result<GeneratorConfig> {
    let config = parse_config_file(path)?;
    let errors = validate_config(&config);
    if !errors.is_empty() {
        let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(Error::Config(joined.join("; ")));
    }
    Ok(config)
}

/// Default `structs.yaml` written by `init`.
pub fn default_config_yaml() -> Result<String> {
    Ok(serde_yaml_ng::to_string(&GeneratorConfig::default())?)
}

/// Number of worker threads: `PARALLELISM` when set to a positive integer,
/// else `max(2, available cores)`.
pub fn parallelism() -> usize {
    parallelism_from(std::env::var(PARALLELISM_VAR).ok().as_deref())
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(2)
}

fn parallelism_from(value: Option<&str>) -> usize {
    match value.map(str::trim) {
        None | Some("") => default_parallelism(),
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                let fallback = default_parallelism();
                tracing::warn!(value = raw, fallback, "invalid {}, using default", PARALLELISM_VAR);
                fallback
            }
        },
    }
}
