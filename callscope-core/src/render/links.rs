//! Source hyperlinks from file documents.
//!
//! File documents carry link groups such as `"VCS Links"`, whose items
//! hold URL templates with a `{{line}}` placeholder.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::callgraph::CallGraph;
use crate::error::CallscopeResult;
use crate::index::IndexClient;
use crate::model::{FileInfo, Location, NodeKey};

pub const DEFAULT_LINK_HEADING: &str = "VCS Links";
pub const DEFAULT_LINK_TITLE: &str = "Normal";
const LINE_PLACEHOLDER: &str = "{{line}}";

/// Build the URL of `line` from a file document, if it has the link.
pub fn line_link(info: &FileInfo, heading: &str, title: &str, line: u32) -> Option<String> {
    info.link(heading, title)
        .map(|href| href.replace(LINE_PLACEHOLDER, &line.to_string()))
}

/// Resolves locations to URLs, fetching each file document once.
pub struct LinkResolver<'a> {
    index: &'a dyn IndexClient,
    heading: String,
    title: String,
    files: RefCell<HashMap<String, Option<FileInfo>>>,
}

impl<'a> LinkResolver<'a> {
    pub fn new(index: &'a dyn IndexClient) -> Self {
        Self {
            index,
            heading: DEFAULT_LINK_HEADING.to_string(),
            title: DEFAULT_LINK_TITLE.to_string(),
            files: RefCell::new(HashMap::new()),
        }
    }

    /// Use a different link group and item.
    pub fn with_link(mut self, heading: impl Into<String>, title: impl Into<String>) -> Self {
        self.heading = heading.into();
        self.title = title.into();
        self
    }

    /// URL for `location`, or `None` when the file has no such link.
    ///
    /// Transport failures are returned as errors.
    pub fn link_for(&self, location: &Location) -> CallscopeResult<Option<String>> {
        if let Some(cached) = self.files.borrow().get(&location.path) {
            return Ok(cached
                .as_ref()
                .and_then(|info| line_link(info, &self.heading, &self.title, location.line)));
        }

        let info = self.index.find_file(&location.path)?;
        if info.is_none() {
            debug!(path = %location.path, "no file document");
        }
        let url = info
            .as_ref()
            .and_then(|i| line_link(i, &self.heading, &self.title, location.line));
        self.files.borrow_mut().insert(location.path.clone(), info);
        Ok(url)
    }

    /// Number of distinct files looked up so far.
    pub fn files_fetched(&self) -> usize {
        self.files.borrow().len()
    }
}

/// URLs for every node that has one.
///
/// A node links to the call site that first reached it; the root links to
/// its own definition.
pub fn node_urls(
    graph: &CallGraph,
    resolver: &LinkResolver<'_>,
) -> CallscopeResult<BTreeMap<NodeKey, String>> {
    let mut urls = BTreeMap::new();
    for (key, node) in graph.nodes() {
        if let Some(url) = resolver.link_for(node.link_location())? {
            urls.insert(key.clone(), url);
        }
    }
    Ok(urls)
}
