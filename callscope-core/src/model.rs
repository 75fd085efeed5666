//! Typed projections of index documents.
//!
//! Everything past the normalization boundary in [`crate::index::document`]
//! works with these records; raw JSON never leaks further.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Substring marking symbols declared in an anonymous namespace.
pub const ANONYMOUS_MARKER: &str = "anonymous";

/// Whether an index document defines a symbol or references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Definition,
    Reference,
}

/// A file path plus 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub line: u32,
}

impl Location {
    pub fn new(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// First non-empty spelling, used for index queries.
fn first_non_empty(names: &[String]) -> Option<&str> {
    names.iter().map(String::as_str).find(|s| !s.is_empty())
}

/// Shortest non-empty spelling; ties keep the earliest entry.
fn shortest_non_empty(names: &[String]) -> Option<&str> {
    names
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .min_by_key(|s| s.len())
}

/// A function definition document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub location: Location,
    /// Unqualified display name
    pub short_name: String,
    /// Every spelling the index carries for this symbol, in index order.
    /// May contain empty strings.
    pub qualified_names: Vec<String>,
    /// Index document id, when the backend exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

impl FunctionDefinition {
    pub fn new(
        path: impl Into<String>,
        line: u32,
        short_name: impl Into<String>,
        qualified_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            location: Location::new(path, line),
            short_name: short_name.into(),
            qualified_names: qualified_names.into_iter().map(Into::into).collect(),
            doc_id: None,
        }
    }

    pub fn with_doc_id(mut self, id: impl Into<String>) -> Self {
        self.doc_id = Some(id.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.location.path
    }

    pub fn line(&self) -> u32 {
        self.location.line
    }

    /// Name used to query the index for references to this function.
    pub fn query_name(&self) -> Option<&str> {
        first_non_empty(&self.qualified_names)
    }

    /// Shortest non-empty qualified name, falling back to the short name.
    pub fn canonical_name(&self) -> &str {
        shortest_non_empty(&self.qualified_names).unwrap_or(&self.short_name)
    }

    /// Whether any spelling places this symbol in an anonymous namespace.
    pub fn is_anonymous(&self) -> bool {
        self.qualified_names
            .iter()
            .any(|q| q.contains(ANONYMOUS_MARKER))
    }

    /// Display label: the short name for anonymous-namespace symbols,
    /// otherwise the canonical name.
    pub fn display_name(&self) -> &str {
        if self.is_anonymous() && !self.short_name.is_empty() {
            &self.short_name
        } else {
            self.canonical_name()
        }
    }

    /// Whether `qualname` is one of this symbol's spellings.
    pub fn has_qualname(&self, qualname: &str) -> bool {
        self.qualified_names.iter().any(|q| q == qualname)
    }

    /// Stable node identity for graph building and rendering.
    pub fn key(&self) -> NodeKey {
        NodeKey {
            path: self.location.path.clone(),
            line: self.location.line,
            name: self.query_name().unwrap_or(&self.short_name).to_string(),
        }
    }

    /// Ordering used to break ties between definitions that are otherwise
    /// indistinguishable (same line, or several root candidates).
    pub(crate) fn tie_break_key(&self) -> (&str, u32, &str, &str, &str) {
        (
            self.path(),
            self.line(),
            self.canonical_name(),
            &self.short_name,
            self.doc_id.as_deref().unwrap_or(""),
        )
    }
}

/// A reference to a function from a call expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub location: Location,
    pub qualified_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

impl CallSite {
    pub fn new(
        path: impl Into<String>,
        line: u32,
        qualified_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            location: Location::new(path, line),
            qualified_names: qualified_names.into_iter().map(Into::into).collect(),
            doc_id: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.location.path
    }

    pub fn line(&self) -> u32 {
        self.location.line
    }

    pub fn has_qualname(&self, qualname: &str) -> bool {
        self.qualified_names.iter().any(|q| q == qualname)
    }
}

/// One index document projected as either a definition or a call reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceReference {
    Definition(FunctionDefinition),
    Reference(CallSite),
}

impl SourceReference {
    pub fn kind(&self) -> RefKind {
        match self {
            Self::Definition(_) => RefKind::Definition,
            Self::Reference(_) => RefKind::Reference,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Self::Definition(d) => &d.location,
            Self::Reference(c) => &c.location,
        }
    }

    pub fn qualified_names(&self) -> &[String] {
        match self {
            Self::Definition(d) => &d.qualified_names,
            Self::Reference(c) => &c.qualified_names,
        }
    }

    pub fn into_definition(self) -> Option<FunctionDefinition> {
        match self {
            Self::Definition(d) => Some(d),
            Self::Reference(_) => None,
        }
    }

    pub fn into_call_site(self) -> Option<CallSite> {
        match self {
            Self::Reference(c) => Some(c),
            Self::Definition(_) => None,
        }
    }
}

/// Composite identity of a function definition: path, line, query name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub path: String,
    pub line: u32,
    pub name: String,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.path, self.line, self.name)
    }
}

/// A link inside a file document's link group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub title: String,
    pub href: String,
}

/// A titled group of links ("VCS Links", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkGroup {
    pub heading: String,
    pub items: Vec<FileLink>,
}

/// File metadata used only for rendering hyperlinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    #[serde(default)]
    pub links: Vec<LinkGroup>,
}

impl FileInfo {
    /// Find a link by group heading and item title.
    pub fn link(&self, heading: &str, title: &str) -> Option<&str> {
        self.links
            .iter()
            .filter(|g| g.heading == heading)
            .flat_map(|g| g.items.iter())
            .find(|item| item.title == title)
            .map(|item| item.href.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_namespace_displays_short_name() {
        let def = FunctionDefinition::new(
            "a.cpp",
            3,
            "foo",
            ["", "ns::(anonymous namespace)::foo", "foo"],
        );
        assert!(def.is_anonymous());
        assert_eq!(def.display_name(), "foo");
    }

    #[test]
    fn test_canonical_name_is_shortest_non_empty() {
        let def = FunctionDefinition::new("a.cpp", 3, "f", ["", "mongo::repl::f", "repl::f"]);
        assert_eq!(def.canonical_name(), "repl::f");
        assert_eq!(def.display_name(), "repl::f");
        assert_eq!(def.query_name(), Some("mongo::repl::f"));
    }

    #[test]
    fn test_all_empty_names_fall_back_to_short_name() {
        let def = FunctionDefinition::new("a.cpp", 3, "lambda", [""]);
        assert_eq!(def.canonical_name(), "lambda");
        assert_eq!(def.query_name(), None);
        assert_eq!(def.key().name, "lambda");
    }

    #[test]
    fn test_key_is_path_line_name() {
        let def = FunctionDefinition::new("x.cpp", 5, "A", ["ns::A"]);
        let key = def.key();
        assert_eq!(key.to_string(), "x.cpp:5#ns::A");
    }

    #[test]
    fn test_file_link_lookup() {
        let info = FileInfo {
            path: "x.cpp".into(),
            links: vec![LinkGroup {
                heading: "VCS Links".into(),
                items: vec![
                    FileLink { title: "Blame".into(), href: "b".into() },
                    FileLink { title: "Normal".into(), href: "n#L{{line}}".into() },
                ],
            }],
        };
        assert_eq!(info.link("VCS Links", "Normal"), Some("n#L{{line}}"));
        assert_eq!(info.link("Other", "Normal"), None);
    }

    #[test]
    fn test_source_reference_kind() {
        let r = SourceReference::Reference(CallSite::new("x.cpp", 8, ["target"]));
        assert_eq!(r.kind(), RefKind::Reference);
        assert_eq!(r.location().line, 8);
        assert!(r.clone().into_definition().is_none());
        assert!(r.into_call_site().is_some());
    }
}
