//! Project configuration discovery and parsing.
//!
//! Resolves the project file (`tsconfig.json` by default) into the file
//! list and option flags the eager pass needs, plus the raw compiler
//! options forwarded verbatim to the full-compiler fallback. Discovery or
//! parse failure is never fatal: the caller degrades to on-demand
//! compilation only.

use crate::errors::ConfigError;
use glob::Pattern;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable forcing a specific project file name.
pub const ENV_PROJECT: &str = "EAGERTS_PROJECT";

/// Default project file name searched for during discovery.
pub const DEFAULT_PROJECT_FILE: &str = "tsconfig.json";

/// `baseUrl` and `paths` mappings declared by the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMappings {
    pub base_url: PathBuf,
    pub paths: HashMap<String, Vec<String>>,
}

/// Optional path-resolution capability.
///
/// When the project declares path mappings and the host supplies a mapper,
/// the mapper is configured once at registration. When it does not, path
/// mapping is disabled with a warning and loads proceed without it.
pub trait PathMapper: Send + Sync {
    fn configure(&self, mappings: &PathMappings) -> Result<(), ConfigError>;
}

/// Resolved, immutable project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// The project file discovery settled on.
    pub project_file: PathBuf,
    /// Directory relative file paths resolve against.
    pub base_path: PathBuf,
    /// Ordered absolute paths of the initial project, declaration-only
    /// files excluded.
    pub files: Vec<PathBuf>,
    /// Whether plain-script extensions are also intercepted.
    pub allow_js: bool,
    /// Whether decorator metadata emission is requested.
    pub emit_decorator_metadata: bool,
    /// Raw `compilerOptions` passthrough for the full-compiler fallback.
    pub raw_options: Option<Value>,
    /// Declared path mappings, if any.
    pub path_mappings: Option<PathMappings>,
}

/// On-disk shape of the project file. Everything is optional; unknown
/// keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProjectFileShape {
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    compiler_options: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CompilerOptionsShape {
    allow_js: bool,
    emit_decorator_metadata: bool,
    base_url: Option<String>,
    paths: Option<HashMap<String, Vec<String>>>,
}

impl ProjectConfig {
    /// Walk up from `start` looking for the project file.
    ///
    /// `override_name` forces a specific file name instead of the default
    /// search (the `EAGERTS_PROJECT` override, read by the caller).
    pub fn discover(start: &Path, override_name: Option<&str>) -> Result<Self, ConfigError> {
        let name = override_name.unwrap_or(DEFAULT_PROJECT_FILE);

        let mut dir = Some(start.to_path_buf());
        while let Some(current) = dir {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
            dir = current.parent().map(|p| p.to_path_buf());
        }

        Err(ConfigError::NotFound {
            name: name.to_string(),
        })
    }

    /// Load and resolve a specific project file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let shape: ProjectFileShape =
            serde_json::from_str(&content).map_err(|err| ConfigError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let options: CompilerOptionsShape = match &shape.compiler_options {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
            None => CompilerOptionsShape::default(),
        };

        let files = resolve_file_list(&base_path, &shape, &options);
        let path_mappings = resolve_path_mappings(&base_path, &options);

        Ok(Self {
            project_file: path.to_path_buf(),
            base_path,
            files,
            allow_js: options.allow_js,
            emit_decorator_metadata: options.emit_decorator_metadata,
            raw_options: shape.compiler_options,
            path_mappings,
        })
    }
}

/// Resolve the ordered project file list: explicit `files` first, then
/// `include` globs minus `exclude`, everything absolute, deduplicated,
/// with declaration-only files dropped.
fn resolve_file_list(
    base: &Path,
    shape: &ProjectFileShape,
    options: &CompilerOptionsShape,
) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    let mut push = |path: PathBuf| {
        if path.to_string_lossy().ends_with(".d.ts") {
            return;
        }
        if seen.insert(path.clone()) {
            files.push(path);
        }
    };

    if let Some(listed) = &shape.files {
        for entry in listed {
            push(absolutize(base, Path::new(entry)));
        }
    }

    let include: Vec<String> = match &shape.include {
        Some(patterns) => patterns.clone(),
        // Neither `files` nor `include`: the whole tree is the project.
        None if shape.files.is_none() => default_include(options.allow_js),
        None => Vec::new(),
    };

    let exclude: Vec<Pattern> = shape
        .exclude
        .clone()
        .unwrap_or_else(|| vec!["**/node_modules/**".to_string()])
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                warn!("skipping invalid exclude pattern {:?}: {}", raw, err);
                None
            }
        })
        .collect();

    for pattern in &include {
        let full = base.join(pattern);
        let full = full.to_string_lossy();
        let walk = match glob::glob(&full) {
            Ok(walk) => walk,
            Err(err) => {
                warn!("skipping invalid include pattern {:?}: {}", pattern, err);
                continue;
            }
        };
        for entry in walk.flatten() {
            if !entry.is_file() {
                continue;
            }
            let relative = entry.strip_prefix(base).unwrap_or(&entry);
            if exclude.iter().any(|p| p.matches_path(relative)) {
                continue;
            }
            push(entry);
        }
    }

    files
}

fn default_include(allow_js: bool) -> Vec<String> {
    let mut patterns = vec!["**/*.ts".to_string(), "**/*.tsx".to_string()];
    if allow_js {
        patterns.push("**/*.js".to_string());
        patterns.push("**/*.jsx".to_string());
    }
    patterns
}

fn resolve_path_mappings(base: &Path, options: &CompilerOptionsShape) -> Option<PathMappings> {
    let paths = options.paths.clone()?;
    if paths.is_empty() {
        return None;
    }
    let base_url = match &options.base_url {
        Some(url) => absolutize(base, Path::new(url)),
        None => base.to_path_buf(),
    };
    Some(PathMappings { base_url, paths })
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
