//! Caller graph produced by one build.
//!
//! Nodes are function definitions keyed by [`NodeKey`]; an edge `A -> B`
//! means a call site inside `A` references `B`.
//!
//! The raw edge list keeps every discovery, duplicates included. Consumers
//! that draw or count arcs go through [`CallGraph::distinct_edges`].

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

use crate::context::BuildStats;
use crate::model::{CallSite, FunctionDefinition, Location, NodeKey};

/// Hex characters kept from the node key digest.
const NODE_ID_LEN: usize = 12;

/// Stable rendering id for a node key.
#[inline]
pub fn node_id(key: &NodeKey) -> String {
    let mut sha = Sha256::new();
    sha.update(key.to_string().as_bytes());
    let mut id = format!("{:x}", sha.finalize());
    id.truncate(NODE_ID_LEN);
    format!("n{id}")
}

// ============================================================================
// Nodes, edges, termination
// ============================================================================

/// A function in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub definition: FunctionDefinition,
    /// Call site through which the node was first discovered; `None` for
    /// the root
    pub reached_via: Option<CallSite>,
    /// Distance from the root in caller hops, at first discovery
    pub depth: usize,
}

impl GraphNode {
    pub fn label(&self) -> &str {
        self.definition.display_name()
    }

    /// Location a hyperlink for this node should point at.
    pub fn link_location(&self) -> &Location {
        self.reached_via
            .as_ref()
            .map(|c| &c.location)
            .unwrap_or(&self.definition.location)
    }
}

/// One discovered call relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEdge {
    pub caller: NodeKey,
    pub callee: NodeKey,
    pub call_site: Location,
}

/// Why the traversal stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// Frontier emptied; the caller set is complete for this index
    Fixpoint,
    /// Depth bound reached with `unexpanded` frontier nodes left
    DepthLimit { unexpanded: usize },
    /// Node cap reached; later callers were not added
    NodeLimit { max_nodes: usize },
}

impl Termination {
    /// Whether the graph may be missing callers.
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::Fixpoint)
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixpoint => write!(f, "complete"),
            Self::DepthLimit { unexpanded } => {
                write!(f, "depth limit reached, {unexpanded} node(s) not expanded")
            }
            Self::NodeLimit { max_nodes } => write!(f, "node limit of {max_nodes} reached"),
        }
    }
}

// ============================================================================
// Call graph
// ============================================================================

/// Frozen result of a caller-graph build.
#[derive(Debug, Clone)]
pub struct CallGraph {
    root: NodeKey,
    nodes: BTreeMap<NodeKey, GraphNode>,
    edges: Vec<CallEdge>,
    termination: Termination,
    stats: BuildStats,
}

impl CallGraph {
    /// Start a graph holding only `root`.
    pub(crate) fn with_root(root: FunctionDefinition) -> Self {
        let key = root.key();
        let mut nodes = BTreeMap::new();
        nodes.insert(
            key.clone(),
            GraphNode {
                definition: root,
                reached_via: None,
                depth: 0,
            },
        );
        Self {
            root: key,
            nodes,
            edges: Vec::new(),
            termination: Termination::Fixpoint,
            stats: BuildStats::default(),
        }
    }

    /// Insert a node unless present. Returns whether it was new.
    pub(crate) fn add_node(
        &mut self,
        definition: FunctionDefinition,
        via: CallSite,
        depth: usize,
    ) -> bool {
        let key = definition.key();
        if self.nodes.contains_key(&key) {
            return false;
        }
        self.nodes.insert(
            key,
            GraphNode {
                definition,
                reached_via: Some(via),
                depth,
            },
        );
        true
    }

    pub(crate) fn add_edge(&mut self, caller: NodeKey, callee: NodeKey, call_site: Location) {
        self.edges.push(CallEdge {
            caller,
            callee,
            call_site,
        });
    }

    pub(crate) fn finish(&mut self, termination: Termination, stats: BuildStats) {
        self.termination = termination;
        self.stats = stats;
    }

    pub fn root(&self) -> &GraphNode {
        // The root is inserted at construction and never removed
        &self.nodes[&self.root]
    }

    pub fn root_key(&self) -> &NodeKey {
        &self.root
    }

    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Nodes in key order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeKey, &GraphNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every edge discovery, in discovery order.
    pub fn raw_edges(&self) -> &[CallEdge] {
        &self.edges
    }

    /// Edges as a set of `(caller, callee)` pairs.
    pub fn distinct_edges(&self) -> BTreeSet<(&NodeKey, &NodeKey)> {
        self.edges.iter().map(|e| (&e.caller, &e.callee)).collect()
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Directed view over distinct edges for graph queries.
    pub fn digraph(&self) -> DiGraphMap<&NodeKey, ()> {
        let mut g = DiGraphMap::new();
        for key in self.nodes.keys() {
            g.add_node(key);
        }
        for (caller, callee) in self.distinct_edges() {
            g.add_edge(caller, callee, ());
        }
        g
    }

    /// Direct callers of `key`, sorted by label then key.
    pub fn callers_of(&self, key: &NodeKey) -> Vec<&GraphNode> {
        let mut callers = self.callers_in(&self.digraph(), key);
        callers.sort_by(|a, b| {
            a.label()
                .cmp(b.label())
                .then_with(|| a.definition.key().cmp(&b.definition.key()))
        });
        callers
    }

    /// Direct callers of `key` in a digraph built once by [`Self::digraph`],
    /// in no particular order.
    pub fn callers_in<'g>(
        &'g self,
        g: &DiGraphMap<&'g NodeKey, ()>,
        key: &NodeKey,
    ) -> Vec<&'g GraphNode> {
        let Some((key, _)) = self.nodes.get_key_value(key) else {
            return Vec::new();
        };
        g.neighbors_directed(key, Direction::Incoming)
            .filter_map(|k| self.nodes.get(k))
            .collect()
    }

    /// Serializable snapshot with rendering ids.
    pub fn export(&self) -> GraphExport {
        let nodes = self
            .nodes
            .iter()
            .map(|(key, node)| ExportNode {
                id: node_id(key),
                label: node.label().to_string(),
                path: key.path.clone(),
                line: key.line,
                qualified_names: node.definition.qualified_names.clone(),
                depth: node.depth,
            })
            .collect();
        let edges = self
            .distinct_edges()
            .into_iter()
            .map(|(caller, callee)| ExportEdge {
                from: node_id(caller),
                to: node_id(callee),
            })
            .collect();
        GraphExport {
            root: node_id(&self.root),
            nodes,
            edges,
            termination: self.termination,
            stats: self.stats.clone(),
        }
    }
}

// ============================================================================
// Typed JSON structures
// ============================================================================

/// A node in the JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ExportNode {
    pub id: String,
    pub label: String,
    pub path: String,
    pub line: u32,
    pub qualified_names: Vec<String>,
    pub depth: usize,
}

/// A caller -> callee arc in the JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ExportEdge {
    pub from: String,
    pub to: String,
}

/// Complete JSON graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub root: String,
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
    pub termination: Termination,
    pub stats: BuildStats,
}
