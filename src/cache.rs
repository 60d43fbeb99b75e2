//! Per-file compilation cache.
//!
//! The single source of truth for "already compiled" state. Entries are
//! keyed by absolute path and live for the whole process; there is no
//! eviction, since a run is typically short-lived.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A cached compiler output. Raw bytes are decoded to text lazily, on
/// first access, and the decoded form replaces the raw one in place.
#[derive(Debug, Clone)]
enum CacheEntry {
    Raw(Vec<u8>),
    Text(Arc<str>),
}

/// Map from absolute file path to transformed source text.
#[derive(Debug, Default)]
pub struct TranspileCache {
    entries: DashMap<PathBuf, CacheEntry>,
}

impl TranspileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when an entry exists for `path`, decoded or not.
    pub fn has(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Fetch the transformed text for `path`.
    ///
    /// Decodes raw bytes on first access and memoizes the decoded form, so
    /// repeat calls are pure lookups returning identical text.
    pub fn get(&self, path: &Path) -> Option<Arc<str>> {
        let mut entry = self.entries.get_mut(path)?;
        let decoded = match &*entry {
            CacheEntry::Text(text) => return Some(Arc::clone(text)),
            CacheEntry::Raw(bytes) => Arc::<str>::from(String::from_utf8_lossy(bytes).into_owned()),
        };
        *entry = CacheEntry::Text(Arc::clone(&decoded));
        Some(decoded)
    }

    /// Store undecoded compiler output. Overwrites unconditionally.
    pub fn put_raw(&self, path: PathBuf, bytes: Vec<u8>) {
        self.entries.insert(path, CacheEntry::Raw(bytes));
    }

    /// Store already-decoded text. Overwrites unconditionally.
    pub fn put_text(&self, path: PathBuf, text: impl Into<Arc<str>>) {
        self.entries.insert(path, CacheEntry::Text(text.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
