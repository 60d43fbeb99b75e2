//! Path exemption rules.
//!
//! A file whose path matches any configured pattern is never transformed;
//! the wrapped loader handles it untouched.

use regex::Regex;
use std::path::Path;
use tracing::warn;

/// Environment variable holding a comma-separated list of patterns.
pub const ENV_IGNORE: &str = "EAGERTS_IGNORE";

/// Default pattern: skip anything under a vendored-dependency tree.
pub const DEFAULT_IGNORE: &str = "(?:^|/)node_modules/";

/// Ordered set of regular expressions deciding which paths are exempt
/// from transformation.
#[derive(Debug)]
pub struct IgnoreMatcher {
    patterns: Vec<Regex>,
}

impl IgnoreMatcher {
    /// Build a matcher from a comma-separated pattern list.
    ///
    /// Invalid patterns are skipped with a warning rather than failing
    /// registration.
    pub fn from_list(spec: &str) -> Self {
        let mut patterns = Vec::new();
        for raw in spec.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match Regex::new(raw) {
                Ok(re) => patterns.push(re),
                Err(err) => warn!("skipping invalid ignore pattern {:?}: {}", raw, err),
            }
        }
        Self { patterns }
    }

    /// Build a matcher from `EAGERTS_IGNORE`, or the default pattern.
    pub fn from_env() -> Self {
        match std::env::var(ENV_IGNORE) {
            Ok(spec) => Self::from_list(&spec),
            Err(_) => Self::from_list(DEFAULT_IGNORE),
        }
    }

    /// True when `path` matches any configured pattern.
    ///
    /// Separators are normalized to `/` before matching so patterns work
    /// unchanged across platforms.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|re| re.is_match(&normalized))
    }
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::from_list(DEFAULT_IGNORE)
    }
}
