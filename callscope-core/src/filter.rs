//! Test-file heuristic for call sites.
//!
//! Call sites inside test sources are excluded from production call
//! graphs. A path is a test path when any configured pattern matches it.

use regex::RegexSet;

use crate::error::{CallscopeError, CallscopeResult};

/// Default markers: a `_test` suffix or a `tests` component.
pub const DEFAULT_TEST_PATTERNS: &[&str] = &["_test", "tests"];

/// Compiled set of test-path patterns.
#[derive(Debug, Clone)]
pub struct TestFileFilter {
    patterns: RegexSet,
}

impl TestFileFilter {
    /// Compile `patterns` (regular expressions matched anywhere in the path).
    pub fn new<I, S>(patterns: I) -> CallscopeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSet::new(patterns)
            .map_err(|e| CallscopeError::invalid(format!("bad test pattern: {e}")))?;
        Ok(Self { patterns })
    }

    /// A filter that never matches.
    pub fn disabled() -> Self {
        Self {
            patterns: RegexSet::empty(),
        }
    }

    pub fn is_test_path(&self, path: &str) -> bool {
        self.patterns.is_match(path)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for TestFileFilter {
    fn default() -> Self {
        // SAFETY: the default patterns are plain literals.
        Self::new(DEFAULT_TEST_PATTERNS).expect("default test patterns are valid")
    }
}
