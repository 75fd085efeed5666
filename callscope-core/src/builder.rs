//! Builder API for caller-graph construction.
//!
//! Provides a fluent interface for configuring and running a build:
//!
//! ```rust,ignore
//! use callscope_core::prelude::*;
//!
//! let ctx = CallContext::new(&index);
//! let graph = CallGraphBuilder::new(&ctx)
//!     .max_depth(4)
//!     .max_nodes(500)
//!     .concurrency(4)
//!     .visited_set(true)
//!     .build("mongo::repl::logOp")?;
//!
//! println!("{} callers ({})", graph.node_count() - 1, graph.termination());
//! ```
//!
//! The traversal is breadth-first and level-synchronous. Every node of the
//! current frontier is expanded on the worker pool; results are merged on
//! the calling thread in frontier order, so the graph never depends on
//! scheduling.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::callgraph::{CallGraph, Termination};
use crate::cancel::CancellationToken;
use crate::context::CallContext;
use crate::error::{CallscopeError, CallscopeResult};
use crate::expand::{find_callers, CallerLink, Expansion};
use crate::model::FunctionDefinition;
use crate::pool::build_pool;
use crate::resolve::find_line_by_qualname;

/// Bounds and tuning for one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Caller hops from the root. Nodes at this depth are not expanded.
    pub max_depth: usize,
    /// Cap on distinct nodes, root included
    pub max_nodes: usize,
    /// Worker threads issuing index queries
    pub concurrency: usize,
    /// Expand each node at most once
    pub visited_set: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_nodes: 500,
            concurrency: 4,
            visited_set: true,
        }
    }
}

impl TraversalOptions {
    pub fn validate(&self) -> CallscopeResult<()> {
        if self.max_nodes == 0 {
            return Err(CallscopeError::invalid("max_nodes must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(CallscopeError::invalid("concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for a caller graph rooted at one qualified name.
pub struct CallGraphBuilder<'c, 'a> {
    ctx: &'c CallContext<'a>,
    options: TraversalOptions,
    cancel: Option<CancellationToken>,
}

impl<'c, 'a> CallGraphBuilder<'c, 'a> {
    /// Create a builder with default bounds.
    pub fn new(ctx: &'c CallContext<'a>) -> Self {
        Self {
            ctx,
            options: TraversalOptions::default(),
            cancel: None,
        }
    }

    /// Replace all traversal options at once.
    pub fn with_options(mut self, options: TraversalOptions) -> Self {
        self.options = options;
        self
    }

    /// Maximum caller depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    /// Maximum number of nodes.
    pub fn max_nodes(mut self, n: usize) -> Self {
        self.options.max_nodes = n;
        self
    }

    /// Number of worker threads.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.options.concurrency = n;
        self
    }

    /// Enable or disable the visited set.
    ///
    /// Without it a node reached again on a later level is expanded again.
    /// The set of distinct edges is the same either way.
    pub fn visited_set(mut self, enabled: bool) -> Self {
        self.options.visited_set = enabled;
        self
    }

    /// Abort the build when `token` is cancelled.
    ///
    /// Checked between levels, in addition to the context's own token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    fn check_cancelled(&self) -> CallscopeResult<()> {
        self.ctx.check_cancelled()?;
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    /// Run the traversal rooted at `qualname`.
    ///
    /// Fails with `NotFound` when no definition matches, `Cancelled` when
    /// a token fires, and with any transport error from the index.
    pub fn build(&self, qualname: &str) -> CallscopeResult<CallGraph> {
        self.options.validate()?;
        let pool = build_pool(self.options.concurrency)?;
        pool.install(|| self.run(qualname))
    }

    fn run(&self, qualname: &str) -> CallscopeResult<CallGraph> {
        let opts = self.options;
        self.check_cancelled()?;

        let root = find_line_by_qualname(self.ctx, qualname)?;
        info!(
            qualname,
            root = %root.location,
            max_depth = opts.max_depth,
            max_nodes = opts.max_nodes,
            "building caller graph"
        );

        let mut graph = CallGraph::with_root(root.clone());
        let mut frontier: Vec<FunctionDefinition> = vec![root];
        let mut depth = 0;

        let termination = loop {
            if frontier.is_empty() {
                break Termination::Fixpoint;
            }
            if depth >= opts.max_depth {
                break Termination::DepthLimit {
                    unexpanded: frontier.len(),
                };
            }
            self.check_cancelled()?;

            let expansions: Vec<CallscopeResult<Expansion>> = frontier
                .par_iter()
                .map(|callee| find_callers(self.ctx, callee))
                .collect();

            let mut next = Vec::new();
            let mut queued = HashSet::new();
            let mut node_limit_hit = false;

            for (callee, result) in frontier.iter().zip(expansions) {
                let expansion = result?;
                let callee_key = callee.key();

                for CallerLink { caller, call } in expansion.links {
                    let key = caller.key();
                    let is_new = if graph.contains(&key) {
                        false
                    } else if graph.node_count() >= opts.max_nodes {
                        node_limit_hit = true;
                        continue;
                    } else {
                        graph.add_node(caller.clone(), call.clone(), depth + 1)
                    };

                    graph.add_edge(key.clone(), callee_key.clone(), call.location);

                    if (is_new || !opts.visited_set) && queued.insert(key) {
                        next.push(caller);
                    }
                }
            }

            debug!(
                depth,
                expanded = frontier.len(),
                next = next.len(),
                nodes = graph.node_count(),
                "level done"
            );

            if node_limit_hit {
                break Termination::NodeLimit {
                    max_nodes: opts.max_nodes,
                };
            }
            frontier = next;
            depth += 1;
        };

        graph.finish(termination, self.ctx.stats());
        info!(
            nodes = graph.node_count(),
            edges = graph.distinct_edges().len(),
            termination = %termination,
            "caller graph built"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;

    fn chain() -> MemoryIndex {
        // c -> b -> a
        MemoryIndex::new()
            .define("a.cpp", 1, "a", &["a"])
            .define("b.cpp", 1, "b", &["b"])
            .define("c.cpp", 1, "c", &["c"])
            .call("b.cpp", 2, "a")
            .call("c.cpp", 2, "b")
    }

    #[test]
    fn test_defaults() {
        let opts = TraversalOptions::default();
        assert_eq!(opts.max_depth, 4);
        assert!(opts.visited_set);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let opts = TraversalOptions {
            max_nodes: 0,
            ..TraversalOptions::default()
        };
        assert!(opts.validate().is_err());
        let opts = TraversalOptions {
            concurrency: 0,
            ..TraversalOptions::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_chain_reaches_fixpoint() {
        let index = chain();
        let ctx = CallContext::new(&index);
        let graph = CallGraphBuilder::new(&ctx).build("a").unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.distinct_edges().len(), 2);
        assert_eq!(graph.termination(), Termination::Fixpoint);
    }

    #[test]
    fn test_depth_limit_reports_unexpanded() {
        let index = chain();
        let ctx = CallContext::new(&index);
        let graph = CallGraphBuilder::new(&ctx).max_depth(1).build("a").unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.termination(), Termination::DepthLimit { unexpanded: 1 });
    }

    #[test]
    fn test_depth_zero_is_root_only() {
        let index = chain();
        let ctx = CallContext::new(&index);
        let graph = CallGraphBuilder::new(&ctx).max_depth(0).build("a").unwrap();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.raw_edges().is_empty());
    }

    #[test]
    fn test_node_limit() {
        let index = MemoryIndex::new()
            .define("t.cpp", 1, "t", &["t"])
            .define("a.cpp", 1, "a", &["a"])
            .define("b.cpp", 1, "b", &["b"])
            .define("c.cpp", 1, "c", &["c"])
            .call("a.cpp", 2, "t")
            .call("b.cpp", 2, "t")
            .call("c.cpp", 2, "t");
        let ctx = CallContext::new(&index);
        let graph = CallGraphBuilder::new(&ctx).max_nodes(3).build("t").unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.termination(), Termination::NodeLimit { max_nodes: 3 });
        // Call-site order decides who gets in
        let names: Vec<&str> = graph.nodes().map(|(_, n)| n.label()).collect();
        assert!(names.contains(&"a") && names.contains(&"b"));
        assert!(!names.contains(&"c"));
    }

    #[test]
    fn test_builder_token_cancels() {
        let index = chain();
        let ctx = CallContext::new(&index);
        let token = CancellationToken::new();
        token.cancel();
        let err = CallGraphBuilder::new(&ctx)
            .cancel_token(token)
            .build("a")
            .unwrap_err();
        assert!(matches!(err, CallscopeError::Cancelled));
        assert_eq!(index.query_count(), 0);
    }

    #[test]
    fn test_missing_root() {
        let index = chain();
        let ctx = CallContext::new(&index);
        let err = CallGraphBuilder::new(&ctx).build("zzz").unwrap_err();
        assert!(matches!(err, CallscopeError::NotFound { .. }));
    }
}
