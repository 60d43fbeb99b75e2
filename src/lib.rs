//! eagerts — eager, transparent module-load transpilation.
//!
//! A host module system registers this crate once at startup; thereafter
//! every load of a typed-superset source file is intercepted, transpiled
//! by a fast external compiler, cached, and executed under its original
//! path. The pipeline:
//! - Eager pass: one batched compile over the whole project list
//! - On-demand path: per-file compilation for everything else
//! - Metadata fallback: full type-aware recompilation, only for files
//!   whose output shows decorator helpers without runtime metadata
//!
//! Type checking is out of scope: sources are transformed, never checked.

pub mod cache;
pub mod compiler;
pub mod config;
pub mod demand;
pub mod eager;
pub mod errors;
pub mod hook;
pub mod ignore;
pub mod logging;
pub mod register;
pub mod sourcemap;

pub use cache::TranspileCache;
pub use compiler::{
    CommandFastCompiler, FastCompiler, FastOptions, FastOutput, FullCompiler, FullCompilerFactory,
    FullOptions, OutputFile, SourceKind, Warning,
};
pub use config::{PathMapper, PathMappings, ProjectConfig};
pub use demand::OnDemandCompiler;
pub use eager::EagerReport;
pub use errors::{CompileError, ConfigError, LoadError};
pub use hook::{ExtensionTable, LoadRequest, Loader, ModuleHost};
pub use ignore::IgnoreMatcher;
pub use logging::LogLevel;
pub use register::{register, RegisterOptions, Registration};
pub use sourcemap::{SourceRetriever, StackTraceMapper};
