//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use callscope_core::prelude::*;
//! ```
//!
//! Brings in what a caller-graph client usually needs without the
//! normalization and pool internals.

// Errors
pub use crate::error::{CallscopeError, CallscopeResult};

// Model
pub use crate::model::{CallSite, FunctionDefinition, Location, NodeKey};

// Index backends
pub use crate::index::{IndexClient, MemoryIndex};
#[cfg(feature = "elastic")]
pub use crate::index::{ElasticConfig, ElasticIndex};

// Building graphs
pub use crate::builder::{CallGraphBuilder, TraversalOptions};
pub use crate::callgraph::{CallGraph, Termination};
pub use crate::cancel::CancellationToken;
pub use crate::context::CallContext;

// Queries and output
pub use crate::queries::{list_callers, list_calls};
pub use crate::render::{generate_dot, node_urls, render_tree, LinkResolver};

// Configuration
pub use crate::config::{load_config, Settings};
