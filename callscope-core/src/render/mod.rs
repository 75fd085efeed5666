//! Presentation of finished caller graphs: text tree, DOT and links.
//!
//! Nothing here queries the index except [`links::LinkResolver`], which
//! needs file documents to build URLs.

pub mod dot;
pub mod links;
pub mod tree;

pub use dot::generate_dot;
pub use links::{line_link, node_urls, LinkResolver, DEFAULT_LINK_HEADING, DEFAULT_LINK_TITLE};
pub use tree::render_tree;
