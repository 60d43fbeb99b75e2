//! Full type-aware compiler adapter.
//!
//! Used only by the decorator-metadata fallback: decorator metadata needs
//! type information the fast transpiler does not have. The service is
//! expensive to construct, so it is built lazily through a factory and
//! reused for every file that needs it.

use crate::errors::CompileError;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Construction options for the full-compiler service.
#[derive(Debug, Clone)]
pub struct FullOptions {
    /// Transform only; the service must never report type errors.
    pub transpile_only: bool,
    /// Raw compiler options passed through from the project file.
    pub compiler_options: Option<Value>,
    /// Skip the service's own project resolution when explicit options
    /// were supplied.
    pub skip_project: bool,
}

impl FullOptions {
    /// Options for the metadata fallback, from the project's raw
    /// passthrough options.
    pub fn for_fallback(compiler_options: Option<Value>) -> Self {
        Self {
            transpile_only: true,
            skip_project: compiler_options.is_some(),
            compiler_options,
        }
    }
}

/// The slow, fully type-aware compiler service.
pub trait FullCompiler: Send + Sync {
    fn compile(&self, source: &str, path: &Path) -> Result<String, CompileError>;
}

/// Capability for constructing the full-compiler service on first use.
///
/// Absent when the host has no such compiler installed; the fallback is
/// then disabled with a warning.
pub type FullCompilerFactory =
    Arc<dyn Fn(&FullOptions) -> Result<Box<dyn FullCompiler>, CompileError> + Send + Sync>;
