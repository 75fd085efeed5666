//! Indented text tree of callers.

use petgraph::graphmap::DiGraphMap;

use crate::callgraph::{CallGraph, GraphNode};
use crate::model::NodeKey;

const INDENT: &str = "||";
const MARKER: &str = "> ";

/// Render the caller tree rooted at the graph root.
///
/// One line per node: `"||"` repeated `depth` times, then `"> "` and the
/// node's shortest qualified name. Children are the node's distinct
/// callers sorted by that same name. Lines at `max_depth` and below are
/// omitted; cycles repeat until that bound.
pub fn render_tree(graph: &CallGraph, max_depth: usize) -> String {
    let g = graph.digraph();
    let mut out = String::new();
    write_node(graph, &g, graph.root(), 0, max_depth, &mut out);
    out
}

fn write_node<'g>(
    graph: &'g CallGraph,
    g: &DiGraphMap<&'g NodeKey, ()>,
    node: &GraphNode,
    depth: usize,
    max_depth: usize,
    out: &mut String,
) {
    if depth >= max_depth {
        return;
    }
    out.push_str(&INDENT.repeat(depth));
    out.push_str(MARKER);
    out.push_str(node.definition.canonical_name());
    out.push('\n');

    let mut callers = graph.callers_in(g, &node.definition.key());
    callers.sort_by(|a, b| {
        a.definition
            .canonical_name()
            .cmp(b.definition.canonical_name())
            .then_with(|| a.definition.key().cmp(&b.definition.key()))
    });
    for caller in callers {
        write_node(graph, g, caller, depth + 1, max_depth, out);
    }
}
