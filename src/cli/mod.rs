//! CLI subcommands: init, validate, generate, check.

use crate::codegen;
use crate::config;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default structs.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate structs.yaml without generating anything
    Validate {
        /// Path to structs.yaml
        #[arg(short, long, default_value = "structs.yaml")]
        file: PathBuf,
    },

    /// Generate struct sources and the lock file
    Generate {
        /// Path to structs.yaml
        #[arg(short, long, default_value = "structs.yaml")]
        file: PathBuf,
    },

    /// Detect generated files that went missing, were edited, or are stale
    Check {
        /// Path to structs.yaml
        #[arg(short, long, default_value = "structs.yaml")]
        file: PathBuf,

        /// Exit non-zero on any drift (for CI)
        #[arg(long)]
        strict: bool,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Generate { file } => cmd_generate(&file),
        Commands::Check { file, strict } => cmd_check(&file, strict),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("structs.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let template = config::default_config_yaml().map_err(|e| e.to_string())?;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized struct generator at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = config::parse_config_file(file).map_err(|e| e.to_string())?;
    let errors = config::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: Struct0..Struct{} into {}",
            config.max_arity - 1,
            config.out_dir.display()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

fn cmd_generate(file: &Path) -> Result<(), String> {
    let config = config::load_config(file).map_err(|e| e.to_string())?;
    let report = codegen::generate(&config).map_err(|e| e.to_string())?;

    for name in &report.written {
        println!("  WROTE:     {}", name);
    }
    for name in &report.deleted {
        println!("  DELETED:   {}", name);
    }
    println!(
        "Generated {}: {} written, {} unchanged, {} deleted",
        config.out_dir.display(),
        report.written.len(),
        report.unchanged.len(),
        report.deleted.len()
    );
    Ok(())
}

fn cmd_check(file: &Path, strict: bool) -> Result<(), String> {
    let config = config::load_config(file).map_err(|e| e.to_string())?;
    let findings = codegen::check(&config).map_err(|e| e.to_string())?;

    if findings.is_empty() {
        println!("No drift detected.");
        return Ok(());
    }

    for f in &findings {
        println!("  DRIFTED: {} [{}] ({})", f.file, f.kind, f.detail);
        println!("    Expected: {}", f.expected_hash);
        println!("    Actual:   {}", f.actual_hash);
    }
    println!();
    println!("Drift detected: {} file(s)", findings.len());
    if strict {
        return Err(format!("{} drift finding(s)", findings.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_project(max_arity: usize) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("structs.yaml");
        let yaml = format!("version: \"1.0\"\nmax_arity: {max_arity}\nout_dir: gen\n");
        std::fs::write(&file, yaml).unwrap();
        (dir, file)
    }

    #[test]
    fn test_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("project");
        cmd_init(&sub).unwrap();
        let file = sub.join("structs.yaml");
        assert!(file.exists());
        cmd_validate(&file).unwrap();
    }

    #[test]
    fn test_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("structs.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_validate_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("structs.yaml");
        std::fs::write(&file, "version: \"3\"\nmax_arity: 0\nout_dir: gen\n").unwrap();
        assert_eq!(cmd_validate(&file).unwrap_err(), "2 validation error(s)");
    }

    #[test]
    fn test_generate_then_check() {
        let (dir, file) = init_project(3);
        cmd_generate(&file).unwrap();
        assert!(dir.path().join("gen/struct2.rs").exists());
        assert!(dir.path().join("gen/structs.lock.yaml").exists());
        cmd_check(&file, true).unwrap();
    }

    #[test]
    fn test_check_strict_fails_on_drift() {
        let (dir, file) = init_project(2);
        cmd_generate(&file).unwrap();
        std::fs::write(dir.path().join("gen/struct1.rs"), "// edited").unwrap();
        assert!(cmd_check(&file, false).is_ok());
        assert_eq!(cmd_check(&file, true).unwrap_err(), "1 drift finding(s)");
    }

    #[test]
    fn test_dispatch_missing_config() {
        let result = dispatch(Commands::Validate {
            file: PathBuf::from("/nonexistent/structs.yaml"),
        });
        assert!(result.unwrap_err().contains("/nonexistent/structs.yaml"));
    }
}
