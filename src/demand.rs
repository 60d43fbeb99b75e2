//! On-demand single-file compilation with the decorator-metadata fallback.
//!
//! Covers files requested through the loader that the eager pass never
//! saw, and escalates to the full compiler for the few files whose fast
//! output shows decorator helpers without the paired metadata helper.

use crate::cache::TranspileCache;
use crate::compiler::{
    log_warnings, FastCompiler, FastOptions, FullCompiler, FullCompilerFactory, FullOptions,
};
use crate::errors::CompileError;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

// The fast transpiler emits a decorate helper whenever decorators are
// used, but can only emit the metadata helper with type information it
// does not have. Helper-present, metadata-absent is the symptom that
// selects the fallback.
static DECORATE_HELPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^var __decorate(?:Class|Param)? = ").unwrap());
static METADATA_HELPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^var __metadata = ").unwrap());

/// True when `js` carries decorator helpers but no metadata helper.
pub(crate) fn needs_metadata(js: &str) -> bool {
    DECORATE_HELPER.is_match(js) && !METADATA_HELPER.is_match(js)
}

/// Lazily compiles individual files into the shared cache.
pub struct OnDemandCompiler {
    cache: Arc<TranspileCache>,
    fast: Arc<dyn FastCompiler>,
    fast_options: FastOptions,
    emit_decorator_metadata: bool,
    raw_options: Option<Value>,
    full_factory: Option<FullCompilerFactory>,
    full: OnceCell<Box<dyn FullCompiler>>,
    fallback_unavailable_warned: AtomicBool,
}

impl OnDemandCompiler {
    pub fn new(
        cache: Arc<TranspileCache>,
        fast: Arc<dyn FastCompiler>,
        fast_options: FastOptions,
        emit_decorator_metadata: bool,
        raw_options: Option<Value>,
        full_factory: Option<FullCompilerFactory>,
    ) -> Self {
        Self {
            cache,
            fast,
            fast_options,
            emit_decorator_metadata,
            raw_options,
            full_factory,
            full: OnceCell::new(),
            fallback_unavailable_warned: AtomicBool::new(false),
        }
    }

    /// Compile `source`, consulting and updating the cache.
    ///
    /// Already-cached files skip the fast compile entirely. When decorator
    /// metadata is requested and the cached output shows it is missing,
    /// the file is recompiled by the full compiler and the entry
    /// overwritten.
    pub fn compile(&self, source: &str, path: &Path) -> Result<Arc<str>, CompileError> {
        if !self.cache.has(path) {
            let result = self.fast.build_source(source, path, &self.fast_options)?;
            log_warnings(&result.warnings);
            match result.outputs.into_iter().next() {
                Some(output) => self.cache.put_raw(path.to_path_buf(), output.contents),
                // Entry stays unset; the lookup below reports it cleanly.
                None => {}
            }
        }

        if self.emit_decorator_metadata {
            if let Some(js) = self.cache.get(path) {
                if needs_metadata(&js) {
                    if let Some(full) = self.full_service()? {
                        debug!("recompiling {} for decorator metadata", path.display());
                        let recompiled = full.compile(source, path)?;
                        self.cache.put_text(path.to_path_buf(), recompiled);
                    }
                }
            }
        }

        self.cache.get(path).ok_or_else(|| CompileError::NoOutput {
            path: path.to_path_buf(),
        })
    }

    /// The full-compiler service, constructed once on first use.
    fn full_service(&self) -> Result<Option<&dyn FullCompiler>, CompileError> {
        let factory = match &self.full_factory {
            Some(factory) => factory,
            None => {
                if !self.fallback_unavailable_warned.swap(true, Ordering::Relaxed) {
                    warn!(
                        "decorator metadata is required but no full compiler is available; \
                         emitted code will lack runtime type metadata"
                    );
                }
                return Ok(None);
            }
        };
        let service = self
            .full
            .get_or_try_init(|| factory(&FullOptions::for_fallback(self.raw_options.clone())))?;
        Ok(Some(service.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{FastOutput, OutputFile};
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn test_metadata_markers() {
        assert!(needs_metadata("var __decorate = x;\nrest"));
        assert!(needs_metadata("var __decorateClass = x;"));
        assert!(needs_metadata("var __decorateParam = x;"));
        assert!(!needs_metadata("var __decorate = x;\nvar __metadata = y;"));
        assert!(!needs_metadata("plain output"));
        // Mid-line occurrences are not helper definitions.
        assert!(!needs_metadata("foo(); var __decorate = x;"));
    }

    struct CountingFast {
        calls: AtomicUsize,
        emit: Mutex<String>,
        produce_output: bool,
    }

    impl CountingFast {
        fn new(emit: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                emit: Mutex::new(emit.to_string()),
                produce_output: true,
            }
        }
    }

    impl FastCompiler for CountingFast {
        fn build_files(
            &self,
            _files: &[PathBuf],
            _opts: &FastOptions,
        ) -> Result<FastOutput, CompileError> {
            Ok(FastOutput::default())
        }

        fn build_source(
            &self,
            _source: &str,
            path: &Path,
            _opts: &FastOptions,
        ) -> Result<FastOutput, CompileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outputs = if self.produce_output {
                vec![OutputFile {
                    path: path.to_path_buf(),
                    contents: self.emit.lock().unwrap().clone().into_bytes(),
                }]
            } else {
                Vec::new()
            };
            Ok(FastOutput {
                outputs,
                warnings: Vec::new(),
            })
        }
    }

    struct CountingFull {
        calls: Arc<AtomicUsize>,
    }

    impl FullCompiler for CountingFull {
        fn compile(&self, _source: &str, _path: &Path) -> Result<String, CompileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("var __decorate = x;\nvar __metadata = y;\nfull output".to_string())
        }
    }

    fn full_factory(calls: Arc<AtomicUsize>) -> FullCompilerFactory {
        Arc::new(move |_opts| {
            Ok(Box::new(CountingFull {
                calls: calls.clone(),
            }) as Box<dyn FullCompiler>)
        })
    }

    fn compiler(
        fast: Arc<dyn FastCompiler>,
        emit_metadata_flag: bool,
        factory: Option<FullCompilerFactory>,
    ) -> OnDemandCompiler {
        OnDemandCompiler::new(
            Arc::new(TranspileCache::new()),
            fast,
            FastOptions::new("node20"),
            emit_metadata_flag,
            None,
            factory,
        )
    }

    #[test]
    fn test_compiles_once_then_serves_from_cache() {
        let fast = Arc::new(CountingFast::new("compiled"));
        let demand = compiler(fast.clone(), false, None);

        let first = demand.compile("source", Path::new("/b.ts")).unwrap();
        let second = demand.compile("source", Path::new("/b.ts")).unwrap();
        assert_eq!(&*first, "compiled");
        assert_eq!(first, second);
        assert_eq!(fast.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_output_fails_cleanly() {
        let mut fake = CountingFast::new("");
        fake.produce_output = false;
        let demand = compiler(Arc::new(fake), false, None);

        let err = demand.compile("source", Path::new("/b.ts")).unwrap_err();
        assert!(matches!(err, CompileError::NoOutput { .. }));
    }

    #[test]
    fn test_fallback_recompiles_when_metadata_missing() {
        let fast = Arc::new(CountingFast::new("var __decorate = x;\nfast output"));
        let full_calls = Arc::new(AtomicUsize::new(0));
        let demand = compiler(fast, true, Some(full_factory(full_calls.clone())));

        let out = demand.compile("@dec class C {}", Path::new("/d.ts")).unwrap();
        assert!(out.contains("__metadata"));
        assert!(out.contains("full output"));
        assert_eq!(full_calls.load(Ordering::SeqCst), 1);

        // Cached fallback output carries the metadata helper, so a second
        // load does not escalate again.
        demand.compile("@dec class C {}", Path::new("/d.ts")).unwrap();
        assert_eq!(full_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_fallback_when_flag_disabled() {
        let fast = Arc::new(CountingFast::new("var __decorate = x;\nfast output"));
        let full_calls = Arc::new(AtomicUsize::new(0));
        let demand = compiler(fast, false, Some(full_factory(full_calls.clone())));

        let out = demand.compile("@dec class C {}", Path::new("/d.ts")).unwrap();
        assert!(!out.contains("__metadata"));
        assert_eq!(full_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_fallback_when_metadata_already_present() {
        let fast = Arc::new(CountingFast::new(
            "var __decorate = x;\nvar __metadata = y;\nfast output",
        ));
        let full_calls = Arc::new(AtomicUsize::new(0));
        let demand = compiler(fast, true, Some(full_factory(full_calls.clone())));

        demand.compile("@dec class C {}", Path::new("/d.ts")).unwrap();
        assert_eq!(full_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_factory_degrades_with_fast_output() {
        let fast = Arc::new(CountingFast::new("var __decorate = x;\nfast output"));
        let demand = compiler(fast, true, None);

        let out = demand.compile("@dec class C {}", Path::new("/d.ts")).unwrap();
        assert!(out.contains("fast output"));
    }

    #[test]
    fn test_full_service_is_constructed_once() {
        let fast = Arc::new(CountingFast::new("var __decorate = x;"));
        let constructions = Arc::new(AtomicUsize::new(0));
        let counter = constructions.clone();
        let factory: FullCompilerFactory = Arc::new(move |_opts| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingFull {
                calls: Arc::new(AtomicUsize::new(0)),
            }) as Box<dyn FullCompiler>)
        });
        let demand = compiler(fast, true, Some(factory));

        demand.compile("@a class A {}", Path::new("/a.ts")).unwrap();
        demand.compile("@b class B {}", Path::new("/b.ts")).unwrap();
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }
}
