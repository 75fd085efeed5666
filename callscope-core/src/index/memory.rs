//! In-memory index over typed records.
//!
//! Used as the fixture backend in tests and for offline runs against a
//! JSON dump of search hits (`--fixture`). Results are returned in
//! insertion order; callers must not rely on that, just as with a server.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{CallscopeError, CallscopeResult};
use crate::index::document::{parse_hits, RawHit};
use crate::index::{Hits, IndexClient};
use crate::model::{CallSite, FileInfo, FunctionDefinition, RefKind, SourceReference};

/// Typed in-memory index.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    definitions: Vec<FunctionDefinition>,
    references: Vec<CallSite>,
    files: HashMap<String, FileInfo>,
    /// Cap applied to every query, mirroring a server-side `size`
    max_results: Option<usize>,
    queries: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function definition.
    pub fn with_definition(mut self, def: FunctionDefinition) -> Self {
        self.definitions.push(def);
        self
    }

    /// Add a function definition from its parts.
    pub fn define(self, path: &str, line: u32, short_name: &str, qualnames: &[&str]) -> Self {
        self.with_definition(FunctionDefinition::new(
            path,
            line,
            short_name,
            qualnames.iter().copied(),
        ))
    }

    /// Add a call reference to `qualname` at `path:line`.
    pub fn call(mut self, path: &str, line: u32, qualname: &str) -> Self {
        self.references.push(CallSite::new(path, line, [qualname]));
        self
    }

    /// Add a file document.
    pub fn with_file(mut self, info: FileInfo) -> Self {
        self.files.insert(info.path.clone(), info);
        self
    }

    /// Cap every query at `n` results.
    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }

    /// Build from raw search hits.
    pub fn from_hits(hits: &[RawHit]) -> Self {
        let mut index = Self::new();
        for hit in hits {
            index.definitions.extend(hit.definitions());
            index.references.extend(hit.references());
            if let Some(info) = hit.file_info() {
                index.files.insert(info.path.clone(), info);
            }
        }
        index
    }

    /// Load a JSON array of raw hits from disk.
    pub fn load(path: &Path) -> CallscopeResult<Self> {
        let body = fs::read_to_string(path).map_err(|e| {
            CallscopeError::invalid(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        Ok(Self::from_hits(&parse_hits(&body)?))
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    fn cap<T>(&self, mut items: Vec<T>) -> Hits<T> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        match self.max_results {
            Some(n) if items.len() > n => {
                items.truncate(n);
                Hits::new(items, true)
            }
            _ => Hits::complete(items),
        }
    }
}

impl IndexClient for MemoryIndex {
    fn find_by_qualname(
        &self,
        qualname: &str,
        kind: RefKind,
    ) -> CallscopeResult<Hits<SourceReference>> {
        let items: Vec<SourceReference> = match kind {
            RefKind::Definition => self
                .definitions
                .iter()
                .filter(|d| d.has_qualname(qualname))
                .cloned()
                .map(SourceReference::Definition)
                .collect(),
            RefKind::Reference => self
                .references
                .iter()
                .filter(|c| c.has_qualname(qualname))
                .cloned()
                .map(SourceReference::Reference)
                .collect(),
        };
        Ok(self.cap(items))
    }

    fn find_definitions_in_file(&self, path: &str) -> CallscopeResult<Hits<FunctionDefinition>> {
        let items = self
            .definitions
            .iter()
            .filter(|d| d.path() == path)
            .cloned()
            .collect();
        Ok(self.cap(items))
    }

    fn find_file(&self, path: &str) -> CallscopeResult<Option<FileInfo>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(self.files.get(path).cloned())
    }

    fn describe(&self) -> String {
        format!(
            "memory index ({} definitions, {} references)",
            self.definitions.len(),
            self.references.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryIndex {
        MemoryIndex::new()
            .define("x.cpp", 5, "A", &["ns::A"])
            .define("y.cpp", 100, "target", &["", "ns::target"])
            .call("x.cpp", 8, "ns::target")
    }

    #[test]
    fn test_find_by_any_spelling() {
        let index = sample();
        let defs = index.find_definitions("ns::target").unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs.items[0].line(), 100);
        assert!(index.find_definitions("target").unwrap().is_empty());
    }

    #[test]
    fn test_kind_filter() {
        let index = sample();
        let refs = index.find_call_sites("ns::target").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.items[0].line(), 8);
        assert!(index.find_call_sites("ns::A").unwrap().is_empty());
    }

    #[test]
    fn test_definitions_in_file() {
        let index = sample();
        let defs = index.find_definitions_in_file("x.cpp").unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs.items[0].short_name, "A");
        assert!(index.find_definitions_in_file("z.cpp").unwrap().is_empty());
    }

    #[test]
    fn test_cap_marks_truncated() {
        let index = MemoryIndex::new()
            .call("a.cpp", 1, "f")
            .call("a.cpp", 2, "f")
            .call("a.cpp", 3, "f")
            .with_max_results(2);
        let refs = index.find_call_sites("f").unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs.truncated);
        assert_eq!(index.query_count(), 1);
    }

    #[test]
    fn test_from_hits() {
        let hits = parse_hits(
            r#"[
                {"_id": "1", "_source": {"path": ["x.cpp"], "number": [5], "c_function": [{"qualname": ["A"], "name": "A"}]}},
                {"_id": "2", "_source": {"path": ["x.cpp"], "number": [8], "c_function_ref": [{"qualname": "target", "name": "target"}]}},
                {"_id": "3", "_source": {"path": ["x.cpp"], "links": []}}
            ]"#,
        )
        .unwrap();
        let index = MemoryIndex::from_hits(&hits);
        assert_eq!(index.definition_count(), 1);
        assert_eq!(index.reference_count(), 1);
        assert!(index.find_file("x.cpp").unwrap().is_some());
        assert!(index.find_file("y.cpp").unwrap().is_none());
    }
}
