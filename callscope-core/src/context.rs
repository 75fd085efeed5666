//! Per-operation query context.
//!
//! Bundles the index handle, the test-file filter, the cancellation token,
//! a cache of per-file definitions and query statistics. One context is
//! built per operation and passed explicitly to the resolver, the expander
//! and the graph builder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::{CallscopeError, CallscopeResult};
use crate::filter::TestFileFilter;
use crate::index::{Hits, IndexClient};
use crate::model::{CallSite, FunctionDefinition};

/// Counters collected while an operation runs.
#[derive(Debug, Default)]
struct QueryStats {
    index_queries: AtomicUsize,
    cached_file_lookups: AtomicUsize,
    call_sites_seen: AtomicUsize,
    test_sites_skipped: AtomicUsize,
    unresolved_sites: AtomicUsize,
    ambiguous_matches: AtomicUsize,
    truncated_results: AtomicUsize,
}

/// Snapshot of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub index_queries: usize,
    pub cached_file_lookups: usize,
    pub call_sites_seen: usize,
    pub test_sites_skipped: usize,
    pub unresolved_sites: usize,
    pub ambiguous_matches: usize,
    /// Answers the index capped; results are a lower bound when non-zero
    pub truncated_results: usize,
}

type FileDefinitions = Arc<Hits<FunctionDefinition>>;

/// Explicit context for every index-backed operation.
pub struct CallContext<'a> {
    index: &'a dyn IndexClient,
    test_filter: TestFileFilter,
    cancel: CancellationToken,
    file_definitions: RwLock<HashMap<String, FileDefinitions>>,
    stats: QueryStats,
}

impl<'a> CallContext<'a> {
    pub fn new(index: &'a dyn IndexClient) -> Self {
        Self {
            index,
            test_filter: TestFileFilter::default(),
            cancel: CancellationToken::new(),
            file_definitions: RwLock::new(HashMap::new()),
            stats: QueryStats::default(),
        }
    }

    pub fn with_test_filter(mut self, filter: TestFileFilter) -> Self {
        self.test_filter = filter;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn index(&self) -> &dyn IndexClient {
        self.index
    }

    pub fn test_filter(&self) -> &TestFileFilter {
        &self.test_filter
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn check_cancelled(&self) -> CallscopeResult<()> {
        self.cancel.check()
    }

    fn note_query<T>(&self, what: &str, key: &str, hits: &Hits<T>) {
        self.stats.index_queries.fetch_add(1, Ordering::Relaxed);
        if hits.truncated {
            self.stats.truncated_results.fetch_add(1, Ordering::Relaxed);
            debug!(query = what, key, returned = hits.len(), "index answer was capped");
        }
    }

    /// Definitions matching `qualname`.
    pub fn find_definitions(&self, qualname: &str) -> CallscopeResult<Hits<FunctionDefinition>> {
        self.check_cancelled()?;
        let hits = self.index.find_definitions(qualname)?;
        self.note_query("definitions", qualname, &hits);
        Ok(hits)
    }

    /// Call sites referencing `qualname`.
    pub fn find_call_sites(&self, qualname: &str) -> CallscopeResult<Hits<CallSite>> {
        self.check_cancelled()?;
        let hits = self.index.find_call_sites(qualname)?;
        self.note_query("call_sites", qualname, &hits);
        Ok(hits)
    }

    /// Function definitions in `path`, fetched once per operation.
    pub fn definitions_in_file(&self, path: &str) -> CallscopeResult<FileDefinitions> {
        {
            let cache = self
                .file_definitions
                .read()
                .map_err(|_| CallscopeError::internal("definition cache lock poisoned"))?;
            if let Some(hit) = cache.get(path) {
                self.stats.cached_file_lookups.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(hit));
            }
        }

        self.check_cancelled()?;
        let hits = self.index.find_definitions_in_file(path)?;
        self.note_query("definitions_in_file", path, &hits);

        let mut cache = self
            .file_definitions
            .write()
            .map_err(|_| CallscopeError::internal("definition cache lock poisoned"))?;
        let entry = cache
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(hits));
        Ok(Arc::clone(entry))
    }

    pub(crate) fn record_call_sites(&self, n: usize) {
        self.stats.call_sites_seen.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_test_sites(&self, n: usize) {
        self.stats.test_sites_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_unresolved(&self, n: usize) {
        self.stats.unresolved_sites.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_ambiguous(&self) {
        self.stats.ambiguous_matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn stats(&self) -> BuildStats {
        let s = &self.stats;
        BuildStats {
            index_queries: s.index_queries.load(Ordering::Relaxed),
            cached_file_lookups: s.cached_file_lookups.load(Ordering::Relaxed),
            call_sites_seen: s.call_sites_seen.load(Ordering::Relaxed),
            test_sites_skipped: s.test_sites_skipped.load(Ordering::Relaxed),
            unresolved_sites: s.unresolved_sites.load(Ordering::Relaxed),
            ambiguous_matches: s.ambiguous_matches.load(Ordering::Relaxed),
            truncated_results: s.truncated_results.load(Ordering::Relaxed),
        }
    }
}
