//! Output formatting - plaintext and JSON.

use serde::Serialize;
use std::fmt::Write;
use tracing::warn;

use crate::callgraph::CallGraph;
use crate::queries::{CallersReport, CallsReport};

/// Plain-text listing of direct callers.
pub fn format_callers(report: &CallersReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Found {} callers of '{}':",
        report.callers.len(),
        report.qualname
    );
    for c in &report.callers {
        let _ = writeln!(out, "{} , {}", c.name, c.location);
    }
    if report.truncated {
        let _ = writeln!(out, "(index results were capped; the list may be incomplete)");
    }
    out
}

/// Plain-text listing of call sites, each followed by its URL if known.
pub fn format_calls(report: &CallsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Found {} calls to '{}':",
        report.calls.len(),
        report.qualname
    );
    for c in &report.calls {
        let _ = writeln!(out, "{}", c.location);
        if let Some(url) = &c.url {
            let _ = writeln!(out, "{}", url);
        }
    }
    if report.truncated {
        let _ = writeln!(out, "(index results were capped; the list may be incomplete)");
    }
    out
}

/// One-line footer describing how a graph build ended.
pub fn format_summary(graph: &CallGraph) -> String {
    let stats = graph.stats();
    let mut line = format!(
        "{} nodes, {} edges ({})",
        graph.node_count(),
        graph.distinct_edges().len(),
        graph.termination()
    );
    if stats.ambiguous_matches > 0 {
        let _ = write!(line, ", {} ambiguous match(es)", stats.ambiguous_matches);
    }
    if stats.truncated_results > 0 {
        let _ = write!(line, ", {} capped index result(s)", stats.truncated_results);
    }
    line
}

/// Pretty JSON for any report.
///
/// Falls back to compact output if pretty printing fails.
pub fn to_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "pretty JSON serialization failed");
            serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
        }
    }
}
