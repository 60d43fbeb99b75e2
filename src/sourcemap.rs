//! Bridge between the cache and the host's stack-trace formatter.
//!
//! Transformed sources carry inline source maps; handing the cache's
//! lookup to the formatter lets runtime errors inside transformed code
//! report original-source positions. No state of its own.

use crate::cache::TranspileCache;
use std::path::Path;
use std::sync::Arc;

/// Retrieval function handed to the stack-trace formatter.
pub type SourceRetriever = Arc<dyn Fn(&Path) -> Option<Arc<str>> + Send + Sync>;

/// A source-map-aware stack-trace formatter supplied by the host.
pub trait StackTraceMapper {
    fn install_retriever(&mut self, retrieve: SourceRetriever);
}

/// Build a retriever backed by the transpile cache.
pub fn retriever(cache: &Arc<TranspileCache>) -> SourceRetriever {
    let cache = Arc::clone(cache);
    Arc::new(move |path: &Path| cache.get(path))
}

/// Point the host's stack-trace formatter at the cache.
pub fn bridge(cache: &Arc<TranspileCache>, mapper: &mut dyn StackTraceMapper) {
    mapper.install_retriever(retriever(cache));
}
