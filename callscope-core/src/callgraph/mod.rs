//! Reverse call-graph construction.
//!
//! ```text
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │     resolve.rs      │     │      expand.rs      │
//! │  ─────────────────  │     │  ─────────────────  │
//! │  Root lookup and    │◄────│  Call sites of one  │
//! │  enclosing function │     │  function -> callers│
//! └─────────────────────┘     └──────────┬──────────┘
//!                                        │
//!                                        ▼
//!            ┌─────────────────────┐     ┌─────────────────────┐
//!            │  crate::builder     │────►│      graph.rs       │
//!            │  ─────────────────  │     │  ─────────────────  │
//!            │  Level-synchronous  │     │  Nodes, raw edges,  │
//!            │  bounded BFS        │     │  termination, JSON  │
//!            └─────────────────────┘     └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use callscope_core::prelude::*;
//!
//! let index = MemoryIndex::load(Path::new("hits.json"))?;
//! let ctx = CallContext::new(&index);
//! let graph = CallGraphBuilder::new(&ctx)
//!     .max_depth(3)
//!     .concurrency(8)
//!     .build("mongo::repl::logOp")?;
//!
//! for (caller, callee) in graph.distinct_edges() {
//!     println!("{caller} -> {callee}");
//! }
//! ```

pub mod graph;

pub use graph::{node_id, CallEdge, CallGraph, ExportEdge, ExportNode, GraphExport, GraphNode, Termination};
