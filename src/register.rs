//! Registration: the one-time wiring of cache, compilers, and hooks.
//!
//! Called once by the host at startup. Discovers the project, runs the
//! eager pass, installs the load hooks and the source-map bridge. Every
//! failure here short of a host bug degrades to on-demand compilation;
//! registration itself never aborts the process.

use crate::cache::TranspileCache;
use crate::compiler::{CommandFastCompiler, FastCompiler, FastOptions, FullCompilerFactory};
use crate::config::{PathMapper, ProjectConfig, ENV_PROJECT};
use crate::demand::OnDemandCompiler;
use crate::eager;
use crate::hook::{extensions_for, install_hooks, ModuleHost};
use crate::ignore::IgnoreMatcher;
use crate::logging::{self, LogLevel};
use crate::sourcemap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Capabilities and overrides supplied by the host at registration.
pub struct RegisterOptions {
    /// Fast transpiler service. Defaults to the esbuild-compatible
    /// command adapter.
    pub fast: Option<Arc<dyn FastCompiler>>,
    /// Full-compiler capability for the decorator-metadata fallback.
    pub full_factory: Option<FullCompilerFactory>,
    /// Path-resolution capability for projects declaring path mappings.
    pub path_mapper: Option<Arc<dyn PathMapper>>,
    /// Ignore rules. Defaults to the `EAGERTS_IGNORE` override or the
    /// vendored-dependency pattern.
    pub ignore: Option<IgnoreMatcher>,
    /// Directory configuration discovery starts from. Defaults to the
    /// current working directory.
    pub base_dir: Option<PathBuf>,
    /// Project file name override. Defaults to the `EAGERTS_PROJECT`
    /// override, then the standard search.
    pub project: Option<String>,
    /// Install the global tracing subscriber. Disable when the host owns
    /// logging setup.
    pub init_logging: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            fast: None,
            full_factory: None,
            path_mapper: None,
            ignore: None,
            base_dir: None,
            project: None,
            init_logging: true,
        }
    }
}

/// Handle owning the registration's state: the cache, the resolved
/// configuration, and the logging guard. Lives for the process.
pub struct Registration {
    cache: Arc<TranspileCache>,
    config: Option<ProjectConfig>,
    _log_guard: Option<WorkerGuard>,
}

impl Registration {
    /// The per-file compilation cache.
    pub fn cache(&self) -> &Arc<TranspileCache> {
        &self.cache
    }

    /// The project configuration, when discovery succeeded.
    pub fn config(&self) -> Option<&ProjectConfig> {
        self.config.as_ref()
    }

    /// A cache-backed retriever for hosts that wire stack traces later.
    pub fn retriever(&self) -> sourcemap::SourceRetriever {
        sourcemap::retriever(&self.cache)
    }
}

/// Register the transpiling load hook against `host`.
pub fn register(host: &mut dyn ModuleHost, options: RegisterOptions) -> Registration {
    let log_guard = if options.init_logging {
        logging::init(LogLevel::from_env())
    } else {
        None
    };

    let base_dir = options
        .base_dir
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let project_override = options
        .project
        .clone()
        .or_else(|| std::env::var(ENV_PROJECT).ok());
    let config = match ProjectConfig::discover(&base_dir, project_override.as_deref()) {
        Ok(config) => {
            info!("using project file {}", config.project_file.display());
            Some(config)
        }
        Err(err) => {
            warn!("{}", err);
            warn!("proceeding without eager compilation");
            None
        }
    };

    if let Some(mappings) = config.as_ref().and_then(|c| c.path_mappings.as_ref()) {
        match &options.path_mapper {
            Some(mapper) => {
                if let Err(err) = mapper.configure(mappings) {
                    warn!("could not configure path mapping: {}", err);
                    warn!("proceeding without path mapping");
                }
            }
            None => {
                warn!("project declares path mappings, but no path mapper is available");
                warn!("proceeding without path mapping");
            }
        }
    }

    let cache = Arc::new(TranspileCache::new());
    let fast: Arc<dyn FastCompiler> = options
        .fast
        .unwrap_or_else(|| Arc::new(CommandFastCompiler::default()));

    let mut fast_options = FastOptions::new(host.runtime_target());
    if let Some(config) = &config {
        fast_options = fast_options.with_project_file(config.project_file.clone());
    }

    if let Some(config) = &config {
        match eager::compile_project(config, fast.as_ref(), &fast_options, &cache) {
            Ok(report) => info!("eager pass seeded {} cache entries", report.compiled),
            Err(err) => {
                warn!("eager compilation failed: {}", err);
                warn!("proceeding with on-demand compilation only");
            }
        }
    }

    let (allow_js, emit_decorator_metadata, raw_options) = match &config {
        Some(config) => (
            config.allow_js,
            config.emit_decorator_metadata,
            config.raw_options.clone(),
        ),
        None => (false, false, None),
    };

    let demand = Arc::new(OnDemandCompiler::new(
        Arc::clone(&cache),
        fast,
        fast_options,
        emit_decorator_metadata,
        raw_options,
        options.full_factory,
    ));

    let ignore = Arc::new(options.ignore.unwrap_or_else(IgnoreMatcher::from_env));
    install_hooks(
        host.extensions(),
        &extensions_for(allow_js),
        ignore,
        demand,
    );

    if let Some(mapper) = host.stack_traces() {
        sourcemap::bridge(&cache, mapper);
    }

    Registration {
        cache,
        config,
        _log_guard: log_guard,
    }
}
