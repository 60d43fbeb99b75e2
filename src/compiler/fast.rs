//! Fast transpiler adapter.
//!
//! The fast compiler strips types and lowers syntax without type
//! information. It is invoked either over the whole project file list
//! (the eager pass) or on a single in-memory source (the on-demand
//! path). Batch outputs carry their originating path explicitly, so a
//! missing output can never misalign an unrelated file's result.

use crate::errors::CompileError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable overriding the external-process buffer limit.
pub const ENV_MAX_BUFFER: &str = "EAGERTS_MAX_BUFFER";

/// Default buffer limit for external-process transports. The host default
/// tends to be too small for medium-sized projects.
pub const DEFAULT_MAX_BUFFER: u64 = 256 * 1024 * 1024;

/// Shared options for fast-compiler invocations.
#[derive(Debug, Clone)]
pub struct FastOptions {
    /// Target runtime version, e.g. `node20`.
    pub target: String,
    /// Output module format.
    pub format: String,
    /// Emit inline source maps so stack traces can be mapped back.
    pub inline_sourcemap: bool,
    /// Scratch directory for adapters that exchange output through the
    /// filesystem. Ignored when output is returned in-memory.
    pub out_dir: PathBuf,
    /// Project file forwarded to the compiler, when one was discovered.
    pub project_file: Option<PathBuf>,
    /// Byte limit for data retained from an external process.
    pub max_buffer: u64,
}

impl FastOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            format: "cjs".to_string(),
            inline_sourcemap: true,
            out_dir: std::env::temp_dir(),
            project_file: None,
            max_buffer: max_buffer_from(std::env::var(ENV_MAX_BUFFER).ok().as_deref()),
        }
    }

    pub fn with_project_file(mut self, path: PathBuf) -> Self {
        self.project_file = Some(path);
        self
    }
}

/// Parse a buffer-limit override, falling back to the raised default.
pub(crate) fn max_buffer_from(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_MAX_BUFFER)
}

/// Source kind, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Ts,
    Tsx,
    Js,
    Jsx,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ts" => Some(Self::Ts),
            "tsx" => Some(Self::Tsx),
            "js" => Some(Self::Js),
            "jsx" => Some(Self::Jsx),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ts => "ts",
            Self::Tsx => "tsx",
            Self::Js => "js",
            Self::Jsx => "jsx",
        }
    }
}

/// One transformed file, paired with the input path that produced it.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// A non-fatal compiler diagnostic.
#[derive(Debug, Clone)]
pub struct Warning {
    pub location: Option<String>,
    pub text: String,
}

/// Result of a fast-compiler invocation.
#[derive(Debug, Default)]
pub struct FastOutput {
    pub outputs: Vec<OutputFile>,
    pub warnings: Vec<Warning>,
}

/// The fast, metadata-incomplete transpiler service.
pub trait FastCompiler: Send + Sync {
    /// Compile a batch of files sharing one set of options.
    fn build_files(&self, files: &[PathBuf], opts: &FastOptions)
        -> Result<FastOutput, CompileError>;

    /// Compile a single in-memory source. The path supplies the source
    /// kind and is reported in diagnostics; the file itself is not read.
    fn build_source(
        &self,
        source: &str,
        path: &Path,
        opts: &FastOptions,
    ) -> Result<FastOutput, CompileError>;
}

/// Reference adapter driving an esbuild-compatible external binary.
///
/// Batch outputs are exchanged through a scratch directory and read back
/// paired by input path; single-source compiles go through stdin/stdout.
#[derive(Debug, Clone)]
pub struct CommandFastCompiler {
    program: PathBuf,
}

impl Default for CommandFastCompiler {
    fn default() -> Self {
        Self::new("esbuild")
    }
}

impl CommandFastCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn shared_args(opts: &FastOptions) -> Vec<String> {
        let mut args = vec![
            format!("--target={}", opts.target),
            format!("--format={}", opts.format),
        ];
        if opts.inline_sourcemap {
            args.push("--sourcemap=inline".to_string());
        }
        if let Some(project) = &opts.project_file {
            args.push(format!("--tsconfig={}", project.display()));
        }
        args
    }

    fn spawn_error(&self, err: std::io::Error) -> CompileError {
        CompileError::Compiler {
            message: format!("could not run {}: {}", self.program.display(), err),
        }
    }
}

impl FastCompiler for CommandFastCompiler {
    fn build_files(
        &self,
        files: &[PathBuf],
        opts: &FastOptions,
    ) -> Result<FastOutput, CompileError> {
        if files.is_empty() {
            return Ok(FastOutput::default());
        }

        let scratch = opts.out_dir.join(format!("eagerts-{}", std::process::id()));
        std::fs::create_dir_all(&scratch).map_err(|source| CompileError::Io {
            path: scratch.clone(),
            source,
        })?;

        let mut command = Command::new(&self.program);
        command
            .args(Self::shared_args(opts))
            .arg(format!("--outdir={}", scratch.display()))
            .args(files);

        let output = command.output().map_err(|err| self.spawn_error(err))?;
        let warnings = stderr_warnings(&output.stderr, opts.max_buffer);
        if !output.status.success() {
            return Err(CompileError::Compiler {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Outputs land under the scratch dir keyed by each input's path
        // relative to the batch's common ancestor.
        let base = common_ancestor(files);
        let mut outputs = Vec::with_capacity(files.len());
        for file in files {
            let relative = file.strip_prefix(&base).unwrap_or(file);
            let produced = scratch.join(relative).with_extension("js");
            if let Ok(contents) = std::fs::read(&produced) {
                outputs.push(OutputFile {
                    path: file.clone(),
                    contents,
                });
            }
            // A missing output is reported by the caller, which knows the
            // full input set; nothing else in the batch is affected.
        }

        Ok(FastOutput { outputs, warnings })
    }

    fn build_source(
        &self,
        source: &str,
        path: &Path,
        opts: &FastOptions,
    ) -> Result<FastOutput, CompileError> {
        let kind = SourceKind::from_path(path).unwrap_or(SourceKind::Ts);

        let mut command = Command::new(&self.program);
        command
            .args(Self::shared_args(opts))
            .arg(format!("--loader={}", kind.as_str()))
            .arg(format!("--sourcefile={}", path.display()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| self.spawn_error(err))?;
        if let Some(mut stdin) = child.stdin.take() {
            // A failed write means the child already exited; its exit
            // status carries the real error.
            let _ = stdin.write_all(source.as_bytes());
        }

        let output = child
            .wait_with_output()
            .map_err(|err| self.spawn_error(err))?;
        let warnings = stderr_warnings(&output.stderr, opts.max_buffer);
        if !output.status.success() {
            return Err(CompileError::Compiler {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let outputs = if output.stdout.is_empty() {
            Vec::new()
        } else {
            vec![OutputFile {
                path: path.to_path_buf(),
                contents: output.stdout,
            }]
        };

        Ok(FastOutput { outputs, warnings })
    }
}

fn stderr_warnings(stderr: &[u8], max_buffer: u64) -> Vec<Warning> {
    let limit = max_buffer.min(stderr.len() as u64) as usize;
    String::from_utf8_lossy(&stderr[..limit])
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Warning {
            location: None,
            text: line.to_string(),
        })
        .collect()
}

/// Deepest directory containing every file in the batch.
fn common_ancestor(files: &[PathBuf]) -> PathBuf {
    let mut iter = files.iter();
    let mut prefix = match iter.next() {
        Some(first) => first
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(PathBuf::new),
        None => return PathBuf::new(),
    };
    for file in iter {
        while !file.starts_with(&prefix) {
            match prefix.parent() {
                Some(parent) => prefix = parent.to_path_buf(),
                None => return PathBuf::new(),
            }
        }
    }
    prefix
}
