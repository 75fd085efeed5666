//! Graphviz DOT output for caller graphs.
//!
//! Uses the `std::fmt::Write` trait for formatting into a pre-sized
//! buffer. The graph is declared `strict`, and edges are emitted from the
//! distinct edge set, so no arc appears twice.

use std::collections::BTreeMap;
use std::fmt::Write;

use tracing::error;

use crate::callgraph::{node_id, CallGraph};
use crate::model::NodeKey;

/// Escape a string for use inside a double-quoted DOT attribute.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Generate a Graphviz DOT representation of the caller graph.
///
/// - one node per distinct definition, labelled with its display name
/// - `URL` attribute when `urls` has an entry for the node
/// - the root is filled lightgreen
/// - edges point from caller to callee
pub fn generate_dot(graph: &CallGraph, urls: &BTreeMap<NodeKey, String>) -> String {
    let edges = graph.distinct_edges();
    let estimated_capacity = (graph.node_count() * 120) + (edges.len() * 40) + 150;
    let mut dot = String::with_capacity(estimated_capacity);

    if let Err(e) = write_dot_content(&mut dot, graph, urls) {
        error!(error = %e, "failed to generate DOT output");
        return "strict digraph callscope {\n}\n".to_string();
    }
    dot
}

fn write_dot_content(
    dot: &mut String,
    graph: &CallGraph,
    urls: &BTreeMap<NodeKey, String>,
) -> std::fmt::Result {
    writeln!(dot, "strict digraph callscope {{")?;
    writeln!(dot, "  rankdir=LR;")?;
    writeln!(dot, "  node [shape=box, fontname=\"JetBrains Mono\"];")?;
    writeln!(dot)?;

    for (key, node) in graph.nodes() {
        write!(
            dot,
            "  \"{}\" [label=\"{}\"",
            node_id(key),
            escape(node.label())
        )?;
        if let Some(url) = urls.get(key) {
            write!(dot, ", URL=\"{}\"", escape(url))?;
        }
        if key == graph.root_key() {
            write!(dot, ", style=filled, fillcolor=lightgreen")?;
        }
        writeln!(dot, "];")?;
    }

    writeln!(dot)?;

    for (caller, callee) in graph.distinct_edges() {
        writeln!(dot, "  \"{}\" -> \"{}\";", node_id(caller), node_id(callee))?;
    }

    writeln!(dot, "}}")?;
    Ok(())
}
