//! Normalization boundary between raw search hits and typed records.
//!
//! DXR-style documents are loosely typed: most fields are arrays even when
//! they hold one value, `qualname` is sometimes a string and sometimes a
//! list, and line numbers occasionally arrive as strings. This module
//! accepts all of those spellings and produces [`crate::model`] records.
//! Hits that lack a path or a usable line number are dropped with a
//! warning instead of failing the whole query.

use serde::Deserialize;
use tracing::warn;

use crate::error::{CallscopeError, CallscopeResult};
use crate::model::{
    CallSite, FileInfo, FunctionDefinition, LinkGroup, Location, RefKind, SourceReference,
};

/// A field that may hold one value or a list of values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(vs) => vs.first(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(v) => std::slice::from_ref(v).iter(),
            Self::Many(vs) => vs.iter(),
        }
    }
}

/// Line numbers are integers in practice, strings in some exports.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLine {
    Number(u64),
    Text(String),
}

impl RawLine {
    fn as_line(&self) -> Option<u32> {
        let n = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().ok()?,
        };
        u32::try_from(n).ok().filter(|&n| n > 0)
    }
}

/// A `c_function` / `c_function_ref` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSymbol {
    #[serde(default)]
    pub qualname: Option<OneOrMany<String>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawSymbol {
    fn qualnames(&self) -> Vec<String> {
        self.qualname
            .as_ref()
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn matches(&self, qualname: &str) -> bool {
        self.qualname
            .as_ref()
            .is_some_and(|q| q.iter().any(|s| s == qualname))
    }
}

/// The `_source` body of a hit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    #[serde(default)]
    pub path: Option<OneOrMany<String>>,
    #[serde(default)]
    pub number: Option<OneOrMany<RawLine>>,
    #[serde(default)]
    pub c_function: Option<OneOrMany<RawSymbol>>,
    #[serde(default)]
    pub c_function_ref: Option<OneOrMany<RawSymbol>>,
    #[serde(default)]
    pub links: Option<Vec<LinkGroup>>,
}

/// One search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: RawSource,
}

/// `hits.total` is a bare number before Elasticsearch 7, an object after.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

impl RawTotal {
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(v) | Self::Object { value: v } => *v,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHitsEnvelope {
    #[serde(default)]
    pub total: Option<RawTotal>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// A search response body.
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub took: Option<u64>,
    pub hits: RawHitsEnvelope,
}

impl RawResponse {
    /// Whether the answer was capped at `size` documents.
    pub fn is_truncated(&self, size: usize) -> bool {
        let returned = self.hits.hits.len();
        let over_total = self
            .hits
            .total
            .as_ref()
            .is_some_and(|t| t.value() > returned as u64);
        returned >= size || over_total
    }
}

/// Parse a search response body.
pub fn parse_response(body: &str) -> CallscopeResult<RawResponse> {
    serde_json::from_str(body).map_err(|e| CallscopeError::malformed(e.to_string()))
}

/// Parse a JSON array of hits (fixture files use this shape).
pub fn parse_hits(body: &str) -> CallscopeResult<Vec<RawHit>> {
    serde_json::from_str(body).map_err(|e| CallscopeError::malformed(e.to_string()))
}

impl RawHit {
    pub fn path(&self) -> Option<&str> {
        self.source
            .path
            .as_ref()
            .and_then(OneOrMany::first)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    pub fn line(&self) -> Option<u32> {
        self.source
            .number
            .as_ref()
            .and_then(OneOrMany::first)
            .and_then(RawLine::as_line)
    }

    fn location(&self) -> Option<(&str, u32)> {
        match (self.path(), self.line()) {
            (Some(path), Some(line)) => Some((path, line)),
            _ => {
                warn!(
                    doc_id = self.id.as_deref().unwrap_or("?"),
                    "dropping index document without path or line"
                );
                None
            }
        }
    }

    fn symbols(&self, kind: RefKind) -> impl Iterator<Item = &RawSymbol> {
        let field = match kind {
            RefKind::Definition => self.source.c_function.as_ref(),
            RefKind::Reference => self.source.c_function_ref.as_ref(),
        };
        field.into_iter().flat_map(OneOrMany::iter)
    }

    fn definition_from(&self, path: &str, line: u32, sym: &RawSymbol) -> FunctionDefinition {
        let qualnames = sym.qualnames();
        let short_name = sym
            .name
            .clone()
            .or_else(|| qualnames.iter().find(|q| !q.is_empty()).cloned())
            .unwrap_or_default();
        FunctionDefinition {
            location: Location::new(path, line),
            short_name,
            qualified_names: qualnames,
            doc_id: self.id.clone(),
        }
    }

    fn call_site_from(&self, path: &str, line: u32, sym: &RawSymbol) -> CallSite {
        CallSite {
            location: Location::new(path, line),
            qualified_names: sym.qualnames(),
            doc_id: self.id.clone(),
        }
    }

    /// Every function definition carried by this document.
    pub fn definitions(&self) -> Vec<FunctionDefinition> {
        if self.symbols(RefKind::Definition).next().is_none() {
            return Vec::new();
        }
        let Some((path, line)) = self.location() else {
            return Vec::new();
        };
        self.symbols(RefKind::Definition)
            .map(|sym| self.definition_from(path, line, sym))
            .collect()
    }

    /// Every call reference carried by this document.
    pub fn references(&self) -> Vec<CallSite> {
        if self.symbols(RefKind::Reference).next().is_none() {
            return Vec::new();
        }
        let Some((path, line)) = self.location() else {
            return Vec::new();
        };
        self.symbols(RefKind::Reference)
            .map(|sym| self.call_site_from(path, line, sym))
            .collect()
    }

    /// Project this document for a qualified-name query.
    ///
    /// A line may define or reference several symbols; only an entry
    /// carrying `qualname` exactly is selected. Phrase matching on the
    /// server also returns longer names that merely contain it.
    pub fn select(&self, qualname: &str, kind: RefKind) -> Option<SourceReference> {
        let sym = self.symbols(kind).find(|s| s.matches(qualname))?;
        let (path, line) = self.location()?;
        Some(match kind {
            RefKind::Definition => SourceReference::Definition(self.definition_from(path, line, sym)),
            RefKind::Reference => SourceReference::Reference(self.call_site_from(path, line, sym)),
        })
    }

    /// File metadata, when this is a file document.
    pub fn file_info(&self) -> Option<FileInfo> {
        let path = self.path()?;
        let links = self.source.links.clone()?;
        Some(FileInfo {
            path: path.to_string(),
            links,
        })
    }
}
