//! Enclosing-function and root resolution.
//!
//! The index stores no containment relation between a reference and the
//! function around it. We rebuild it from line numbers: the enclosing
//! function of a reference is the definition in the same file with the
//! greatest line number strictly below the reference.
//!
//! Both lookups can face several equally good candidates (duplicate
//! documents for one line, a name defined in several files). Choices are
//! made by a fixed ordering so that repeated runs against the same index
//! produce the same graph, and every real ambiguity is logged and counted.

use tracing::{debug, warn};

use crate::context::CallContext;
use crate::error::{CallscopeError, CallscopeResult};
use crate::model::{FunctionDefinition, Location};

/// All definitions on the nearest line above `line`, in tie-break order.
fn candidates_above<'d>(
    definitions: &'d [FunctionDefinition],
    path: &str,
    line: u32,
) -> Vec<&'d FunctionDefinition> {
    let above = definitions
        .iter()
        .filter(|d| d.path() == path && d.line() < line);

    let Some(best_line) = above.clone().map(FunctionDefinition::line).max() else {
        return Vec::new();
    };
    let mut at_line: Vec<&FunctionDefinition> =
        above.filter(|d| d.line() == best_line).collect();
    at_line.sort_by(|a, b| a.tie_break_key().cmp(&b.tie_break_key()));
    at_line
}

/// Pick the nearest definition above `line` among `definitions`.
///
/// Only definitions whose path equals `path` are considered. Returns the
/// chosen definition and how many candidates shared its line.
pub fn nearest_definition_above<'d>(
    definitions: &'d [FunctionDefinition],
    path: &str,
    line: u32,
) -> Option<(&'d FunctionDefinition, usize)> {
    let at_line = candidates_above(definitions, path, line);
    let count = at_line.len();
    at_line.first().map(|d| (*d, count))
}

/// Whether two candidate definitions describe different symbols.
fn distinct_symbols(candidates: &[&FunctionDefinition]) -> bool {
    candidates
        .windows(2)
        .any(|w| w[0].key() != w[1].key())
}

/// Map a source location to the function that lexically contains it.
///
/// Fails with [`CallscopeError::NoEnclosingFunction`] when the file has no
/// definition above the location. Callers treat that as "skip this
/// reference", never as a build failure.
pub fn find_enclosing_function(
    ctx: &CallContext<'_>,
    location: &Location,
) -> CallscopeResult<FunctionDefinition> {
    let defs = ctx.definitions_in_file(&location.path)?;

    let candidates = candidates_above(&defs.items, &location.path, location.line);

    let Some(chosen) = candidates.first() else {
        if defs.truncated {
            debug!(%location, "no enclosing function among a capped definition list");
        }
        return Err(CallscopeError::no_enclosing(&location.path, location.line));
    };

    if distinct_symbols(&candidates) {
        ctx.record_ambiguous();
        warn!(
            %location,
            candidates = candidates.len(),
            chosen = chosen.canonical_name(),
            "several definitions share the enclosing line"
        );
    }

    Ok((*chosen).clone())
}

/// Order root candidates: exact spelling first, then non-test files, then
/// path, line and name.
fn rank_roots<'d>(
    ctx: &CallContext<'_>,
    qualname: &str,
    candidates: &'d [FunctionDefinition],
) -> Vec<&'d FunctionDefinition> {
    let exact: Vec<&FunctionDefinition> =
        candidates.iter().filter(|d| d.has_qualname(qualname)).collect();
    let mut pool = if exact.is_empty() {
        candidates.iter().collect()
    } else {
        exact
    };

    let filter = ctx.test_filter();
    pool.sort_by(|a, b| {
        filter
            .is_test_path(a.path())
            .cmp(&filter.is_test_path(b.path()))
            .then_with(|| a.tie_break_key().cmp(&b.tie_break_key()))
    });
    pool
}

/// Resolve the definition a caller graph is rooted at.
///
/// Fails with [`CallscopeError::NotFound`] when no definition matches.
pub fn find_line_by_qualname(
    ctx: &CallContext<'_>,
    qualname: &str,
) -> CallscopeResult<FunctionDefinition> {
    let hits = ctx.find_definitions(qualname)?;
    let ranked = rank_roots(ctx, qualname, &hits.items);

    let Some(first) = ranked.first() else {
        return Err(CallscopeError::not_found(qualname));
    };

    if distinct_symbols(&ranked) {
        ctx.record_ambiguous();
        warn!(
            qualname,
            candidates = ranked.len(),
            chosen = %first.location,
            "qualified name matches several definitions"
        );
    }

    Ok((*first).clone())
}
