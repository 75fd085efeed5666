//! Caller expansion: one function's direct callers.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::error::{CallscopeError, CallscopeResult};
use crate::model::{CallSite, FunctionDefinition};
use crate::resolve::find_enclosing_function;

/// A caller paired with the call site that made it one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerLink {
    pub caller: FunctionDefinition,
    pub call: CallSite,
}

/// Result of expanding one function.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    /// Callers in call-site order (path, line)
    pub links: Vec<CallerLink>,
    pub skipped_test_sites: usize,
    /// Call sites with no definition above them in their file
    pub unresolved_sites: usize,
    /// The call-site query was capped by the index
    pub truncated: bool,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Find the direct callers of `callee`.
///
/// Call sites in test files are skipped. Call sites that cannot be mapped
/// to an enclosing function are counted and skipped. Any other failure
/// aborts the expansion.
pub fn find_callers(
    ctx: &CallContext<'_>,
    callee: &FunctionDefinition,
) -> CallscopeResult<Expansion> {
    let Some(name) = callee.query_name() else {
        warn!(
            location = %callee.location,
            name = %callee.short_name,
            "definition has no qualified name; cannot search for callers"
        );
        return Ok(Expansion::default());
    };

    let hits = ctx.find_call_sites(name)?;
    let truncated = hits.truncated;
    let mut sites = hits.items;
    sites.sort_by(|a, b| {
        a.location
            .cmp(&b.location)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    ctx.record_call_sites(sites.len());

    let filter = ctx.test_filter();
    let before = sites.len();
    sites.retain(|site| !filter.is_test_path(site.path()));
    let skipped_test_sites = before - sites.len();
    ctx.record_test_sites(skipped_test_sites);

    // Indexed collect keeps call-site order regardless of scheduling
    let resolved: Vec<CallscopeResult<FunctionDefinition>> = sites
        .par_iter()
        .map(|site| find_enclosing_function(ctx, &site.location))
        .collect();

    let mut links = Vec::with_capacity(sites.len());
    let mut unresolved_sites = 0;
    for (site, result) in sites.into_iter().zip(resolved) {
        match result {
            Ok(caller) => links.push(CallerLink { caller, call: site }),
            Err(CallscopeError::NoEnclosingFunction { path, line }) => {
                debug!(path = %path, line, "call site outside any known function");
                unresolved_sites += 1;
            }
            Err(e) => return Err(e),
        }
    }
    ctx.record_unresolved(unresolved_sites);

    debug!(
        callee = name,
        callers = links.len(),
        skipped_test_sites,
        unresolved_sites,
        "expanded"
    );

    Ok(Expansion {
        links,
        skipped_test_sites,
        unresolved_sites,
        truncated,
    })
}
