//! Configuration loading from callscope.toml.
//!
//! The file is optional and every key in it is optional. [`Settings`] holds
//! the resolved values; command-line flags are applied on top of it by the
//! binary before [`Settings::validate`] runs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::builder::TraversalOptions;
use crate::error::{CallscopeError, CallscopeResult};
use crate::filter::{TestFileFilter, DEFAULT_TEST_PATTERNS};

/// Default file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "callscope.toml";

/// Main configuration structure for callscope.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CallscopeConfig {
    pub index: Option<IndexSection>,
    pub traversal: Option<TraversalSection>,
    pub filter: Option<FilterSection>,
}

/// `[index]`: where and how to query.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct IndexSection {
    /// Search service base URL.
    pub endpoint: Option<String>,
    /// Explicit index name; auto-selected when absent.
    pub name: Option<String>,
    /// Substring an auto-selected index must contain.
    pub include: Option<String>,
    /// Substrings an auto-selected index must not contain.
    pub exclude: Option<Vec<String>>,
    /// Maximum documents per query.
    pub max_results: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    /// Initial retry backoff, doubled after every failure.
    pub backoff_ms: Option<u64>,
}

/// `[traversal]`: graph build bounds.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TraversalSection {
    pub max_depth: Option<usize>,
    pub max_nodes: Option<usize>,
    pub concurrency: Option<usize>,
    pub visited_set: Option<bool>,
}

/// `[filter]`: test-file detection.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FilterSection {
    /// Regular expressions; a path matching any of them is a test file.
    pub test_patterns: Option<Vec<String>>,
}

/// Loads configuration from an explicit path.
pub fn load_config(path: &Path) -> Result<CallscopeConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg = toml::from_str(&content)
        .map_err(|e| CallscopeError::config(path, e.to_string()))
        .context("Invalid callscope.toml")?;
    Ok(cfg)
}

/// Loads callscope.toml from `dir` if it exists.
pub fn find_config(dir: &Path) -> Result<Option<(PathBuf, CallscopeConfig)>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let cfg = load_config(&path)?;
    Ok(Some((path, cfg)))
}

/// Resolved index connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub endpoint: String,
    pub name: Option<String>,
    pub include: String,
    pub exclude: Vec<String>,
    pub max_results: usize,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            name: None,
            include: "dxr".to_string(),
            exclude: Vec::new(),
            max_results: 1000,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Fully resolved settings, constructed once and passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub index: IndexSettings,
    pub traversal: TraversalOptions,
    pub test_patterns: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index: IndexSettings::default(),
            traversal: TraversalOptions::default(),
            test_patterns: DEFAULT_TEST_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Overlay file values on the defaults.
    pub fn from_config(cfg: &CallscopeConfig) -> Self {
        let mut s = Self::default();

        if let Some(index) = &cfg.index {
            let i = &mut s.index;
            if let Some(v) = &index.endpoint {
                i.endpoint = v.clone();
            }
            if index.name.is_some() {
                i.name = index.name.clone();
            }
            if let Some(v) = &index.include {
                i.include = v.clone();
            }
            if let Some(v) = &index.exclude {
                i.exclude = v.clone();
            }
            if let Some(v) = index.max_results {
                i.max_results = v;
            }
            if let Some(v) = index.timeout_secs {
                i.timeout = Duration::from_secs(v);
            }
            if let Some(v) = index.max_retries {
                i.max_retries = v;
            }
            if let Some(v) = index.backoff_ms {
                i.backoff = Duration::from_millis(v);
            }
        }

        if let Some(t) = &cfg.traversal {
            let o = &mut s.traversal;
            o.max_depth = t.max_depth.unwrap_or(o.max_depth);
            o.max_nodes = t.max_nodes.unwrap_or(o.max_nodes);
            o.concurrency = t.concurrency.unwrap_or(o.concurrency);
            o.visited_set = t.visited_set.unwrap_or(o.visited_set);
        }

        if let Some(patterns) = cfg.filter.as_ref().and_then(|f| f.test_patterns.clone()) {
            s.test_patterns = patterns;
        }

        s
    }

    /// Reject values no operation can run with.
    pub fn validate(&self) -> CallscopeResult<()> {
        if self.index.endpoint.trim().is_empty() {
            return Err(CallscopeError::invalid("index endpoint must not be empty"));
        }
        if self.index.max_results == 0 {
            return Err(CallscopeError::invalid("max_results must be at least 1"));
        }
        if self.index.timeout.is_zero() {
            return Err(CallscopeError::invalid("timeout_secs must be at least 1"));
        }
        self.traversal.validate()?;
        self.test_filter().map(|_| ())
    }

    pub fn traversal_options(&self) -> TraversalOptions {
        self.traversal
    }

    pub fn test_filter(&self) -> CallscopeResult<TestFileFilter> {
        TestFileFilter::new(&self.test_patterns)
    }

    #[cfg(feature = "elastic")]
    pub fn to_elastic_config(&self) -> crate::index::ElasticConfig {
        let i = &self.index;
        crate::index::ElasticConfig {
            endpoint: i.endpoint.clone(),
            index: i.name.clone(),
            include: i.include.clone(),
            exclude: i.exclude.clone(),
            max_results: i.max_results,
            timeout: i.timeout,
            max_retries: i.max_retries,
            initial_backoff: i.backoff,
            ..crate::index::ElasticConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir()
            .join("callscope_config_tests")
            .join(format!("{}_{}", std::process::id(), id));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.index.endpoint, "http://localhost:9200");
        assert_eq!(s.index.max_results, 1000);
        assert_eq!(s.traversal.max_depth, 4);
        assert_eq!(s.test_patterns, vec!["_test", "tests"]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_overlay() {
        let cfg: CallscopeConfig = toml::from_str(
            r#"
            [index]
            endpoint = "http://es:9200"
            name = "dxr_mongodb"
            exclude = ["mongodb_v"]
            backoff_ms = 100

            [traversal]
            max_depth = 2
            visited_set = false

            [filter]
            test_patterns = ["/unittest/"]
            "#,
        )
        .unwrap();
        let s = Settings::from_config(&cfg);
        assert_eq!(s.index.endpoint, "http://es:9200");
        assert_eq!(s.index.name.as_deref(), Some("dxr_mongodb"));
        assert_eq!(s.index.include, "dxr");
        assert_eq!(s.index.backoff, Duration::from_millis(100));
        assert_eq!(s.traversal.max_depth, 2);
        assert_eq!(s.traversal.max_nodes, 500);
        assert!(!s.traversal.visited_set);
        let filter = s.test_filter().unwrap();
        assert!(filter.is_test_path("src/unittest/a.cpp"));
        assert!(!filter.is_test_path("src/a_test.cpp"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut s = Settings::default();
        s.index.max_results = 0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.traversal.concurrency = 0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.test_patterns = vec!["(".to_string()];
        assert!(matches!(s.validate(), Err(CallscopeError::InvalidArgument { .. })));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = temp_dir();
        fs::write(dir.join(CONFIG_FILE_NAME), "[traversal]\nmax_nodes = 7\n").unwrap();
        let (path, cfg) = find_config(&dir).unwrap().unwrap();
        assert!(path.ends_with(CONFIG_FILE_NAME));
        assert_eq!(Settings::from_config(&cfg).traversal.max_nodes, 7);
    }

    #[test]
    fn test_config_not_found() {
        let dir = temp_dir();
        assert!(find_config(&dir).unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = temp_dir();
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, "[traversal]\nmax_depht = 3\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid callscope.toml"));
        let inner = err.downcast_ref::<CallscopeError>().unwrap();
        assert_eq!(inner.path(), Some(&path));
    }

    #[cfg(feature = "elastic")]
    #[test]
    fn test_to_elastic_config() {
        let mut s = Settings::default();
        s.index.name = Some("idx".into());
        s.index.max_retries = 0;
        let e = s.to_elastic_config();
        assert_eq!(e.index.as_deref(), Some("idx"));
        assert_eq!(e.max_retries, 0);
        assert_eq!(e.max_results, 1000);
    }
}
