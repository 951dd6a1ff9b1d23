//! Struct generator: writes `struct{N}.rs` files for other projects and
//! detects drift between those files, the lock and the current renderer.

pub mod hasher;
pub mod lock;
pub mod render;

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use lock::StructLock;
use regex::Regex;
use std::fmt;
use std::path::Path;

const STRUCT_FILE_PATTERN: &str = r"^struct[0-9]+\.rs$";

/// Outcome of a `generate` run, by file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateReport {
    pub written: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    /// Expected file absent from disk
    Missing,
    /// Disk content differs from the hash recorded in the lock
    Modified,
    /// Disk content no longer matches what the generator would write
    Stale,
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriftKind::Missing => "missing",
            DriftKind::Modified => "modified",
            DriftKind::Stale => "stale",
        };
        write!(f, "{}", s)
    }
}

/// A single drift finding.
#[derive(Debug, Clone)]
pub struct DriftFinding {
    pub file: String,
    pub kind: DriftKind,
    pub expected_hash: String,
    pub actual_hash: String,
    pub detail: String,
}

fn header_block(config: &GeneratorConfig) -> String {
    let Some(header) = &config.header else {
        return String::new();
    };
    let mut block: String = header
        .lines()
        .map(|l| if l.is_empty() { "//\n".to_string() } else { format!("// {}\n", l) })
        .collect();
    block.push('\n');
    block
}

/// File name to content, in write order: `struct0.rs..` then `mod.rs`.
pub fn render_files(config: &GeneratorConfig) -> IndexMap<String, String> {
    let header = header_block(config);
    let mut files = IndexMap::new();
    for arity in 0..config.max_arity {
        let body = render::render_struct(arity, &config.trait_path);
        files.insert(
            render::file_name(arity),
            format!("{header}{}\n\n{body}", render::GENERATED_MARKER),
        );
    }
    let module = render::render_module(config.max_arity);
    files.insert("mod.rs".to_string(), format!("{header}{module}"));
    files
}

fn struct_files_on_disk(out_dir: &Path) -> Result<Vec<String>> {
    if !out_dir.exists() {
        return Ok(Vec::new());
    }
    let pattern = Regex::new(STRUCT_FILE_PATTERN).map_err(|e| Error::Config(e.to_string()))?;
    let entries = std::fs::read_dir(out_dir).map_err(|e| Error::io(out_dir, e))?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| pattern.is_match(name))
        .collect();
    names.sort();
    Ok(names)
}

/// Write every struct file and `mod.rs`, delete struct files beyond
/// `max_arity`, and record the hashes in the lock.
pub fn generate(config: &GeneratorConfig) -> Result<GenerateReport> {
    let out_dir = config.out_dir.as_path();
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

    let files = render_files(config);
    let mut report = GenerateReport::default();
    let mut lock = StructLock::new(config.max_arity);

    for (name, content) in &files {
        let path = out_dir.join(name);
        let current = std::fs::read_to_string(&path).ok();
        if current.as_deref() == Some(content.as_str()) {
            tracing::debug!(file = %path.display(), "unchanged");
            report.unchanged.push(name.clone());
        } else {
            std::fs::write(&path, content).map_err(|e| Error::io(&path, e))?;
            tracing::info!(file = %path.display(), "written");
            report.written.push(name.clone());
        }
        lock.files.insert(name.clone(), hasher::hash_string(content));
    }

    for name in struct_files_on_disk(out_dir)? {
        if files.contains_key(&name) {
            continue;
        }
        let path = out_dir.join(&name);
        std::fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        tracing::info!(file = %path.display(), "deleted");
        report.deleted.push(name);
    }

    lock::save_lock(out_dir, &lock)?;
    Ok(report)
}

/// Compare the files on disk with the lock and the current renderer.
pub fn check(config: &GeneratorConfig) -> Result<Vec<DriftFinding>> {
    let out_dir = config.out_dir.as_path();
    let files = render_files(config);
    let recorded = lock::load_lock(out_dir)?.map(|l| l.files).unwrap_or_default();
    let mut findings = Vec::new();

    for (name, content) in &files {
        let fresh = hasher::hash_string(content);
        let path = out_dir.join(name);
        if !path.exists() {
            findings.push(DriftFinding {
                file: name.clone(),
                kind: DriftKind::Missing,
                expected_hash: fresh,
                actual_hash: "MISSING".to_string(),
                detail: format!("{} does not exist", path.display()),
            });
            continue;
        }
        let actual = hasher::hash_file(&path)?;
        match recorded.get(name) {
            Some(locked) if *locked != actual => findings.push(DriftFinding {
                file: name.clone(),
                kind: DriftKind::Modified,
                expected_hash: locked.clone(),
                actual_hash: actual,
                detail: format!("{} changed since it was generated", path.display()),
            }),
            _ if actual != fresh => findings.push(DriftFinding {
                file: name.clone(),
                kind: DriftKind::Stale,
                expected_hash: fresh,
                actual_hash: actual,
                detail: format!("{} differs from current generator output", path.display()),
            }),
            _ => {}
        }
    }

    for name in struct_files_on_disk(out_dir)? {
        if files.contains_key(&name) {
            continue;
        }
        let actual = hasher::hash_file(&out_dir.join(&name))?;
        findings.push(DriftFinding {
            detail: format!("{} is beyond max_arity {}", name, config.max_arity),
            file: name,
            kind: DriftKind::Stale,
            expected_hash: "ABSENT".to_string(),
            actual_hash: actual,
        });
    }

    for f in &findings {
        tracing::warn!(file = %f.file, kind = %f.kind, "{}", f.detail);
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(out_dir: PathBuf, max_arity: usize) -> GeneratorConfig {
        GeneratorConfig {
            max_arity,
            out_dir,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_struct_shapes() {
        let s0 = render::render_struct(0, "crate::Struct");
        assert!(s0.contains("pub struct Struct0;"));
        let s1 = render::render_struct(1, "crate::Struct");
        assert!(s1.contains("pub struct Struct1<T0>(pub T0);"));
        assert!(s1.contains("From<(T0,)> for Struct1<T0>"));
        let s3 = render::render_struct(3, "x::Struct");
        assert!(s3.contains("pub fn new(t0: T0, t1: T1, t2: T2) -> Self"));
        assert!(s3.contains("pub fn get2(&self) -> &T2"));
        assert!(s3.contains(
            "impl<T0: 'static, T1: 'static, T2: 'static> x::Struct for Struct3<T0, T1, T2>"
        ));
        assert!(!s3.contains("get3"));
    }

    #[test]
    fn test_render_module_lists_every_struct() {
        let m = render::render_module(3);
        assert!(m.contains("mod struct2;"));
        assert!(m.contains("pub use struct0::Struct0;"));
        assert!(!m.contains("struct3"));
    }

    #[test]
    fn test_header_prefixes_every_file() {
        let mut cfg = config(PathBuf::from("out"), 2);
        cfg.header = Some("Copyright Example\nAll rights reserved".to_string());
        for content in render_files(&cfg).values() {
            assert!(content.starts_with("// Copyright Example\n// All rights reserved\n\n"));
        }
    }

    #[test]
    fn test_generate_writes_files_and_lock() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path().join("gen"), 4);
        let report = generate(&cfg).unwrap();
        assert_eq!(
            report.written,
            vec!["struct0.rs", "struct1.rs", "struct2.rs", "struct3.rs", "mod.rs"]
        );
        assert!(report.deleted.is_empty());

        let lock = lock::load_lock(&cfg.out_dir).unwrap().unwrap();
        assert_eq!(lock.max_arity, 4);
        assert_eq!(lock.files.len(), 5);
        let on_disk = hasher::hash_file(&cfg.out_dir.join("struct2.rs")).unwrap();
        assert_eq!(lock.files["struct2.rs"], on_disk);
    }

    #[test]
    fn test_generate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path().to_path_buf(), 2);
        generate(&cfg).unwrap();
        let again = generate(&cfg).unwrap();
        assert!(again.written.is_empty());
        assert_eq!(again.unchanged.len(), 3);
    }

    #[test]
    fn test_generate_deletes_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        generate(&config(dir.path().to_path_buf(), 5)).unwrap();
        std::fs::write(dir.path().join("notes.rs"), "// keep").unwrap();
        let report = generate(&config(dir.path().to_path_buf(), 3)).unwrap();
        assert_eq!(report.deleted, vec!["struct3.rs", "struct4.rs"]);
        assert!(dir.path().join("notes.rs").exists());
        assert!(!dir.path().join("struct4.rs").exists());
    }

    #[test]
    fn test_check_clean_after_generate() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path().to_path_buf(), 3);
        generate(&cfg).unwrap();
        assert!(check(&cfg).unwrap().is_empty());
    }

    #[test]
    fn test_check_reports_missing_modified_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path().to_path_buf(), 3);
        generate(&cfg).unwrap();
        std::fs::remove_file(dir.path().join("struct0.rs")).unwrap();
        std::fs::write(dir.path().join("struct1.rs"), "// edited").unwrap();
        std::fs::write(dir.path().join("struct7.rs"), "// orphan").unwrap();

        let findings = check(&cfg).unwrap();
        let kinds: Vec<(&str, DriftKind)> =
            findings.iter().map(|f| (f.file.as_str(), f.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("struct0.rs", DriftKind::Missing),
                ("struct1.rs", DriftKind::Modified),
                ("struct7.rs", DriftKind::Stale),
            ]
        );
        assert_eq!(findings[0].actual_hash, "MISSING");
    }

    #[test]
    fn test_check_without_lock_compares_to_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path().to_path_buf(), 2);
        generate(&cfg).unwrap();
        std::fs::remove_file(lock::lock_file_path(dir.path())).unwrap();
        std::fs::write(dir.path().join("mod.rs"), "// hand written").unwrap();
        let findings = check(&cfg).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, DriftKind::Stale);
        assert_eq!(findings[0].file, "mod.rs");
    }
}
