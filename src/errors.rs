//! Error types for configuration discovery, compilation, and module loading.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failure while discovering or parsing the project configuration.
///
/// These are always recoverable: the eager pass is skipped and the loader
/// falls back to on-demand compilation.
#[derive(Debug)]
pub enum ConfigError {
    /// No project file was found walking up from the start directory.
    NotFound { name: String },
    /// The project file exists but could not be read.
    Read { path: PathBuf, source: io::Error },
    /// The project file could not be parsed.
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => {
                write!(f, "no {} found in this directory or any parent", name)
            }
            Self::Read { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            Self::Parse { path, message } => {
                write!(f, "could not parse {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure inside a compiler adapter.
#[derive(Debug)]
pub enum CompileError {
    /// The external compiler could not be invoked or reported a fatal error.
    Compiler { message: String },
    /// The compiler ran but produced no output for this file.
    NoOutput { path: PathBuf },
    /// A batch output could not be paired with any input file.
    Unpaired { path: PathBuf },
    /// Filesystem error while exchanging data with the compiler.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compiler { message } => write!(f, "compiler error: {}", message),
            Self::NoOutput { path } => {
                write!(f, "compiler produced no output for {}", path.display())
            }
            Self::Unpaired { path } => {
                write!(f, "compiler output {} matches no input file", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "io error for {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure on the module-load path. Propagates to the host unmodified;
/// nothing on this path is retried.
#[derive(Debug)]
pub enum LoadError {
    /// The source file could not be read.
    Read { path: PathBuf, source: io::Error },
    /// Compilation of the source failed.
    Compile(CompileError),
    /// The host module system rejected the final text.
    Host { message: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "could not read module {}: {}", path.display(), source)
            }
            Self::Compile(err) => write!(f, "{}", err),
            Self::Host { message } => write!(f, "module system error: {}", message),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Compile(err) => Some(err),
            Self::Host { .. } => None,
        }
    }
}

impl From<CompileError> for LoadError {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}
