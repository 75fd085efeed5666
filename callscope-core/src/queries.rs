//! One-shot lookups behind `--callers` and `--calls`.

use serde::Serialize;
use tracing::info;

use crate::context::CallContext;
use crate::error::{CallscopeError, CallscopeResult};
use crate::expand::find_callers;
use crate::model::Location;
use crate::pool::build_pool;
use crate::render::LinkResolver;
use crate::resolve::find_line_by_qualname;

/// A direct caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerEntry {
    /// Short name of the calling function
    pub name: String,
    pub qualified_name: String,
    /// Where the caller is defined
    pub location: Location,
    pub call_site: Location,
}

/// Direct callers of one qualified name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallersReport {
    pub qualname: String,
    /// Resolved definition; `None` when the name is unknown
    pub definition: Option<Location>,
    pub callers: Vec<CallerEntry>,
    pub skipped_test_sites: usize,
    pub unresolved_sites: usize,
    pub truncated: bool,
}

/// A reference to the queried name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEntry {
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Every call site of one qualified name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallsReport {
    pub qualname: String,
    pub calls: Vec<CallEntry>,
    pub truncated: bool,
}

/// List the direct, non-test callers of `qualname`, with at most
/// `concurrency` index queries in flight.
///
/// An unknown name yields an empty report rather than an error.
pub fn list_callers(
    ctx: &CallContext<'_>,
    qualname: &str,
    concurrency: usize,
) -> CallscopeResult<CallersReport> {
    build_pool(concurrency)?.install(|| collect_callers(ctx, qualname))
}

fn collect_callers(ctx: &CallContext<'_>, qualname: &str) -> CallscopeResult<CallersReport> {
    let root = match find_line_by_qualname(ctx, qualname) {
        Ok(def) => def,
        Err(CallscopeError::NotFound { .. }) => {
            info!(qualname, "no definition found");
            return Ok(CallersReport {
                qualname: qualname.to_string(),
                ..CallersReport::default()
            });
        }
        Err(e) => return Err(e),
    };

    let expansion = find_callers(ctx, &root)?;
    let callers = expansion
        .links
        .into_iter()
        .map(|link| CallerEntry {
            name: link.caller.short_name.clone(),
            qualified_name: link.caller.canonical_name().to_string(),
            location: link.caller.location,
            call_site: link.call.location,
        })
        .collect();

    Ok(CallersReport {
        qualname: qualname.to_string(),
        definition: Some(root.location),
        callers,
        skipped_test_sites: expansion.skipped_test_sites,
        unresolved_sites: expansion.unresolved_sites,
        truncated: expansion.truncated,
    })
}

/// List every reference to `qualname`, test files included, in location
/// order. With a resolver, each entry carries a source URL.
pub fn list_calls(
    ctx: &CallContext<'_>,
    qualname: &str,
    links: Option<&LinkResolver<'_>>,
) -> CallscopeResult<CallsReport> {
    let hits = ctx.find_call_sites(qualname)?;
    let truncated = hits.truncated;
    let mut locations: Vec<Location> = hits.items.into_iter().map(|c| c.location).collect();
    locations.sort();

    let mut calls = Vec::with_capacity(locations.len());
    for location in locations {
        let url = match links {
            Some(resolver) => resolver.link_for(&location)?,
            None => None,
        };
        calls.push(CallEntry { location, url });
    }

    Ok(CallsReport {
        qualname: qualname.to_string(),
        calls,
        truncated,
    })
}
