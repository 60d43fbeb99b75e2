//! Compiler adapters.
//!
//! Two pluggable external services sit behind these traits: a fast,
//! syntax-only transpiler used for everything, and a slower type-aware
//! compiler used only by the decorator-metadata fallback.

pub mod fast;
pub mod full;

pub use fast::{
    CommandFastCompiler, FastCompiler, FastOptions, FastOutput, OutputFile, SourceKind, Warning,
};
pub use full::{FullCompiler, FullCompilerFactory, FullOptions};

use tracing::warn;

/// Log compiler warnings. Warnings never abort compilation, of this file
/// or any other.
pub(crate) fn log_warnings(warnings: &[Warning]) {
    for warning in warnings {
        match &warning.location {
            Some(location) => warn!("{}: {}", location, warning.text),
            None => warn!("{}", warning.text),
        }
    }
}
