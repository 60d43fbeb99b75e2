//! Eager whole-project compilation.
//!
//! Runs once at registration, before any module load: one batched
//! fast-compiler call over the resolved file list, seeding the cache so
//! the common case never pays a per-file compile at load time.

use crate::cache::TranspileCache;
use crate::compiler::{log_warnings, FastCompiler, FastOptions};
use crate::config::ProjectConfig;
use crate::errors::CompileError;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// Outcome of the eager pass, for logging and tests.
#[derive(Debug, Default)]
pub struct EagerReport {
    /// Files whose output was cached.
    pub compiled: usize,
    /// Inputs the compiler produced no output for.
    pub missing: Vec<PathBuf>,
    /// Outputs that matched no input file.
    pub unpaired: Vec<PathBuf>,
}

/// Compile every file in the project list and seed the cache.
///
/// Warnings are logged and never abort. Output/input pairing goes through
/// the paths carried on each output, so a dropped output is detected and
/// reported without corrupting any other file's entry.
pub fn compile_project(
    config: &ProjectConfig,
    fast: &dyn FastCompiler,
    opts: &FastOptions,
    cache: &TranspileCache,
) -> Result<EagerReport, CompileError> {
    if config.files.is_empty() {
        info!("project file list is empty, nothing to compile eagerly");
        return Ok(EagerReport::default());
    }

    info!("eagerly compiling {} files", config.files.len());
    if tracing::enabled!(tracing::Level::INFO) {
        for file in &config.files {
            info!("  {}", file.display());
        }
    }

    let result = fast.build_files(&config.files, opts)?;
    log_warnings(&result.warnings);

    let inputs: HashSet<&PathBuf> = config.files.iter().collect();
    let mut report = EagerReport::default();
    let mut produced = HashSet::new();

    for output in result.outputs {
        if !inputs.contains(&output.path) {
            warn!(
                "{}",
                CompileError::Unpaired {
                    path: output.path.clone()
                }
            );
            report.unpaired.push(output.path);
            continue;
        }
        produced.insert(output.path.clone());
        cache.put_raw(output.path, output.contents);
        report.compiled += 1;
    }

    for file in &config.files {
        if !produced.contains(file) {
            warn!("{}", CompileError::NoOutput { path: file.clone() });
            report.missing.push(file.clone());
        }
    }

    Ok(report)
}
