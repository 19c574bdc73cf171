//! Post-processors that turn a [`ParserMatch`](crate::ParserMatch) chain
//! into something an application actually wants to walk: a flat tagged
//! token stream, a tag/scope hierarchy, or a parser-shaped tree.

mod scope_tree;
mod tokens;
mod tree;

pub use scope_tree::{scope_tree, ScopeNode, ScopeNodeKind};
pub use tokens::{tagged_tokens, Token};
pub use tree::{tree, TreeNode};
