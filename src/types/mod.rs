//! Core types for node management.

pub mod node;
pub mod options;

pub use node::{Node, NodeId, NodeType};
pub use options::{NodeGetOptions, PaginationDefaults, RawNodeQuery, UNCONSTRAINED};
