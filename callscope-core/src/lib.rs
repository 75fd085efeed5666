//! callscope-core: reverse call-graph resolution over a code-intelligence index
//!
//! Given a qualified function name, find every function that calls it,
//! directly or transitively, using only two index lookups: references to a
//! qualified name, and the function definitions in a file. The function
//! enclosing a reference is the definition with the nearest line above it.
//!
//! # Quick Start
//!
//! Use the [`prelude`] module for convenient imports:
//!
//! ```rust,ignore
//! use callscope_core::prelude::*;
//!
//! let index = ElasticIndex::connect(ElasticConfig::default())?;
//! let ctx = CallContext::new(&index);
//! let graph = CallGraphBuilder::new(&ctx)
//!     .max_depth(4)
//!     .build("mongo::repl::logOp")?;
//!
//! print!("{}", render_tree(&graph, 4));
//! ```
//!
//! # Module Organization
//!
//! - [`index`]: the [`IndexClient`] trait, document normalization, HTTP and in-memory backends
//! - [`model`]: typed definitions, call sites and node keys
//! - [`context`]: per-operation context (index, filter, cancellation, cache, statistics)
//! - [`resolve`]: root lookup and enclosing-function resolution
//! - [`expand`]: direct callers of one function
//! - [`builder`]: bounded breadth-first graph construction
//! - [`callgraph`]: the resulting graph and its JSON form
//! - [`render`]: text tree, Graphviz DOT, source links
//! - [`queries`]: `list_callers` and `list_calls`
//! - [`config`]: callscope.toml loading and resolved settings
//! - [`error`]: typed error handling
//!
//! # Cargo Features
//!
//! - `elastic` (default): Elasticsearch client via `reqwest`
//! - `full`: Enable all optional features

pub mod builder;
pub mod callgraph;
pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod expand;
pub mod filter;
pub mod index;
pub mod logging;
pub mod model;
pub mod pool;
pub mod prelude;
pub mod queries;
pub mod render;
pub mod report;
pub mod resolve;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{CallscopeError, CallscopeResult};

// Data model
pub use model::{
    CallSite, FileInfo, FileLink, FunctionDefinition, LinkGroup, Location, NodeKey, RefKind,
    SourceReference, ANONYMOUS_MARKER,
};

// Index access
pub use index::{Hits, IndexClient, MemoryIndex};
#[cfg(feature = "elastic")]
pub use index::{ElasticConfig, ElasticIndex};

// Context and traversal
pub use builder::{CallGraphBuilder, TraversalOptions};
pub use cancel::CancellationToken;
pub use context::{BuildStats, CallContext};
pub use expand::{find_callers, CallerLink, Expansion};
pub use filter::{TestFileFilter, DEFAULT_TEST_PATTERNS};
pub use pool::build_pool;
pub use resolve::{find_enclosing_function, find_line_by_qualname, nearest_definition_above};

// Graph
pub use callgraph::{
    node_id, CallEdge, CallGraph, ExportEdge, ExportNode, GraphExport, GraphNode, Termination,
};

// Presentation
pub use queries::{list_callers, list_calls, CallEntry, CallerEntry, CallersReport, CallsReport};
pub use render::{generate_dot, line_link, node_urls, render_tree, LinkResolver};
pub use report::{format_callers, format_calls, format_summary, to_json};

// Configuration
pub use config::{find_config, load_config, CallscopeConfig, IndexSettings, Settings};

// Logging
pub use logging::{init_pretty_logging, init_structured_logging};
