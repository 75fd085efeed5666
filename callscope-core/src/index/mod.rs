//! Code-intelligence index access.
//!
//! The graph algorithms only see the [`IndexClient`] trait. Two backends
//! implement it:
//!
//! - [`ElasticIndex`]: blocking HTTP against an Elasticsearch instance
//!   holding DXR-style documents (feature `elastic`)
//! - [`MemoryIndex`]: typed records in memory, used for fixtures and tests
//!
//! No backend promises an ordering, and every answer may be capped. The
//! [`Hits::truncated`] flag marks answers that may be incomplete.

use crate::error::CallscopeResult;
use crate::model::{CallSite, FileInfo, FunctionDefinition, RefKind, SourceReference};

pub mod document;
#[cfg(feature = "elastic")]
pub mod elastic;
pub mod memory;

#[cfg(feature = "elastic")]
pub use elastic::{ElasticConfig, ElasticIndex};
pub use memory::MemoryIndex;

/// Result set of one index query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hits<T> {
    pub items: Vec<T>,
    /// The backend capped the answer; more matches may exist.
    pub truncated: bool,
}

impl<T> Hits<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            truncated: false,
        }
    }

    pub fn new(items: Vec<T>, truncated: bool) -> Self {
        Self { items, truncated }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keep the truncation flag while transforming the items.
    pub fn filter_map<U>(self, f: impl FnMut(T) -> Option<U>) -> Hits<U> {
        Hits {
            items: self.items.into_iter().filter_map(f).collect(),
            truncated: self.truncated,
        }
    }
}

impl<T> Default for Hits<T> {
    fn default() -> Self {
        Self::complete(Vec::new())
    }
}

/// Lookups the resolver and graph builder need from an index.
///
/// Implementations must be usable from several worker threads at once.
pub trait IndexClient: Send + Sync {
    /// All documents whose qualified-name field has `qualname` as any of
    /// its values, restricted to `kind`.
    fn find_by_qualname(
        &self,
        qualname: &str,
        kind: RefKind,
    ) -> CallscopeResult<Hits<SourceReference>>;

    /// Every function definition in `path`.
    fn find_definitions_in_file(&self, path: &str) -> CallscopeResult<Hits<FunctionDefinition>>;

    /// File metadata for `path`, `None` when the index has no file document.
    fn find_file(&self, path: &str) -> CallscopeResult<Option<FileInfo>>;

    /// Short label for logs and error messages.
    fn describe(&self) -> String;

    /// Definitions matching `qualname`.
    fn find_definitions(&self, qualname: &str) -> CallscopeResult<Hits<FunctionDefinition>> {
        Ok(self
            .find_by_qualname(qualname, RefKind::Definition)?
            .filter_map(SourceReference::into_definition))
    }

    /// Call references to `qualname`.
    fn find_call_sites(&self, qualname: &str) -> CallscopeResult<Hits<CallSite>> {
        Ok(self
            .find_by_qualname(qualname, RefKind::Reference)?
            .filter_map(SourceReference::into_call_site))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_map_keeps_truncation() {
        let hits = Hits::new(vec![1, 2, 3, 4], true);
        let evens = hits.filter_map(|n| (n % 2 == 0).then_some(n));
        assert_eq!(evens.items, vec![2, 4]);
        assert!(evens.truncated);
    }

    #[test]
    fn test_default_is_empty_and_complete() {
        let hits: Hits<u32> = Hits::default();
        assert!(hits.is_empty());
        assert!(!hits.truncated);
    }
}
