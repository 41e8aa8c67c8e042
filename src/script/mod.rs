//! Decompiled script as a typed tree.
//!
//! The external parser hands over a JSON tree ([`raw`]); [`ScriptTree`]
//! resolves it into an arena of [`NodeData`] with parent links, walkable in
//! pre-order and renderable back to source. [`coerce`] turns literal nodes
//! into numbers, strings and codes.

pub mod coerce;
pub mod node;
pub mod raw;
pub mod render;
pub mod traverse;
pub mod tree;

pub use coerce::{LiteralTarget, Numeric};
pub use node::{Children, NodeData, NodeId, NodeKind, ScriptNode};
pub use raw::{RawArguments, RawNode, RawValue};
pub use traverse::Dfs;
pub use tree::ScriptTree;
