//! Module-load hook and the capability-based extension table.
//!
//! The host runtime exposes its loader table as an explicit object; the
//! hook composes with whatever loader was installed before it instead of
//! replacing it, so exempt files flow to the prior handler unchanged.

use crate::demand::OnDemandCompiler;
use crate::errors::LoadError;
use crate::ignore::IgnoreMatcher;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Typed-source extensions, always intercepted.
pub const TYPED_EXTENSIONS: [&str; 2] = ["ts", "tsx"];

/// Plain-script extensions, intercepted only when the project allows
/// untyped script files.
pub const SCRIPT_EXTENSIONS: [&str; 2] = ["js", "jsx"];

/// One in-flight module load, created by the host per request.
pub trait LoadRequest {
    /// Absolute path of the module being loaded.
    fn path(&self) -> &Path;

    /// Hand final source text to the module system's compile entry point.
    /// The module is always compiled under its original path so runtime
    /// errors report against it.
    fn compile(&mut self, source: &str) -> Result<(), LoadError>;
}

/// A loader installed for one extension.
pub type Loader = Arc<dyn Fn(&mut dyn LoadRequest) -> Result<(), LoadError> + Send + Sync>;

/// The host's extension-to-loader table.
///
/// Installation returns the previously registered loader, which is how
/// the hook preserves chain-of-responsibility semantics.
pub struct ExtensionTable {
    entries: HashMap<String, Loader>,
    default_script: Loader,
}

impl ExtensionTable {
    /// Build a table whose unregistered extensions fall back to the
    /// plain-script loader.
    pub fn new(default_script: Loader) -> Self {
        Self {
            entries: HashMap::new(),
            default_script,
        }
    }

    /// The loader currently registered for `ext` (no leading dot).
    pub fn get(&self, ext: &str) -> Option<Loader> {
        self.entries.get(ext).cloned()
    }

    /// The loader for `ext`, or the plain-script default when none is
    /// registered yet.
    pub fn get_or_default(&self, ext: &str) -> Loader {
        self.get(ext)
            .unwrap_or_else(|| Arc::clone(&self.default_script))
    }

    /// Install a loader, returning the one it displaced.
    pub fn install(&mut self, ext: &str, loader: Loader) -> Option<Loader> {
        self.entries.insert(ext.to_string(), loader)
    }

    /// Dispatch a load request by the path's extension.
    pub fn load(&self, request: &mut dyn LoadRequest) -> Result<(), LoadError> {
        let ext = request
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let loader = self.get_or_default(ext);
        loader(request)
    }
}

/// Host runtime surface needed at registration time.
pub trait ModuleHost {
    /// The runtime's extension-to-loader table.
    fn extensions(&mut self) -> &mut ExtensionTable;

    /// Target version string for the fast compiler, e.g. `node20`.
    fn runtime_target(&self) -> String;

    /// The host's source-map-aware stack-trace formatter, if it has one.
    fn stack_traces(&mut self) -> Option<&mut dyn crate::sourcemap::StackTraceMapper> {
        None
    }
}

/// Extensions to intercept for this project.
pub fn extensions_for(allow_js: bool) -> Vec<&'static str> {
    let mut extensions = Vec::new();
    if allow_js {
        extensions.extend(SCRIPT_EXTENSIONS);
    }
    extensions.extend(TYPED_EXTENSIONS);
    extensions
}

/// Wrap the current loader for each extension with the transpiling hook.
///
/// Ignored paths delegate to the wrapped loader, not the native default,
/// so a loader chain installed before registration keeps working.
pub fn install_hooks(
    table: &mut ExtensionTable,
    extensions: &[&str],
    ignore: Arc<IgnoreMatcher>,
    demand: Arc<OnDemandCompiler>,
) {
    for ext in extensions {
        let previous = table.get_or_default(ext);
        let ignore = Arc::clone(&ignore);
        let demand = Arc::clone(&demand);

        let hook: Loader = Arc::new(move |request| {
            let path = request.path().to_path_buf();
            if ignore.should_ignore(&path) {
                debug!("ignoring {}", path.display());
                return previous(request);
            }
            let source = fs::read_to_string(&path).map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            })?;
            let transformed = demand.compile(&source, &path)?;
            request.compile(&transformed)
        });

        table.install(ext, hook);
    }
}
