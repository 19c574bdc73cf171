//! A parser-shaped tree, built by recovering each combinator's own children
//! from the flat match chain rather than from explicit tag/scope markers
//! (contrast [`scope_tree`](super::scope_tree)).
//!
//! This works because every composite in [`parser`](crate::parser)
//! synthesizes a wrapping match whose `offset`/`right` span its full set of
//! children (see e.g. `match_sequence`): walking `previous` back from such a
//! match naturally stays inside that span until it reaches whatever was fed
//! in from *outside* the combinator, which is exactly where the monotonic
//! `previous.right <= offset` invariant draws the line.

use crate::match_::ParserMatch;
use crate::parser::ScopeKind;

/// A node in the tree produced by [`tree`].
#[derive(Debug, Clone)]
pub struct TreeNode {
    source: ParserMatch,
    children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn source_match(&self) -> &ParserMatch {
        &self.source
    }

    pub fn tag(&self) -> Option<String> {
        self.source.tag()
    }

    pub fn value(&self) -> String {
        self.source.value()
    }

    pub fn offset(&self) -> u32 {
        self.source.offset()
    }

    pub fn right(&self) -> u32 {
        self.source.right()
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }
}

/// Builds a [`TreeNode`] from `m`, recursively recovering each match's own
/// constituent matches. When `prune` is set, a node whose source parser has
/// neither a tag nor a scope is collapsed into its single child (or dropped
/// entirely if it has none); a node with more than one child is always kept,
/// since there is no single child to collapse into.
pub fn tree(m: &ParserMatch, prune: bool) -> TreeNode {
    build(m, prune).unwrap_or_else(|| TreeNode {
        source: m.clone(),
        children: Vec::new(),
    })
}

fn build(m: &ParserMatch, prune: bool) -> Option<TreeNode> {
    let children: Vec<TreeNode> = own_children(m)
        .into_iter()
        .filter_map(|c| build(&c, prune))
        .collect();

    let carries_metadata = m
        .source_parser()
        .map(|p| p.tag_name().is_some() || p.scope_kind() != ScopeKind::None)
        .unwrap_or(false);

    if prune && !carries_metadata {
        return match children.len() {
            0 => None,
            1 => children.into_iter().next(),
            _ => Some(TreeNode { source: m.clone(), children }),
        };
    }
    Some(TreeNode { source: m.clone(), children })
}

/// The matches directly contributed by `m`'s own combinator, oldest first:
/// walk `previous` while the predecessor's span still overlaps `m`'s own
/// (`right > m.offset()`), stopping at the first predecessor that belongs
/// to whatever came before `m` started.
fn own_children(m: &ParserMatch) -> Vec<ParserMatch> {
    let mut kids = Vec::new();
    let mut cur = m.previous().cloned();
    while let Some(c) = cur {
        if c.right() <= m.offset() {
            break;
        }
        cur = c.previous().cloned();
        kids.push(c);
    }
    kids.reverse();
    kids
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::{literal_char, sequence};
    use crate::scanner::ParseOptions;

    #[test]
    fn unpruned_tree_recovers_every_tagged_child_in_order() {
        let grammar = sequence(vec![
            literal_char('a').tag("a"),
            literal_char('b').tag("b"),
        ])
        .unwrap();
        let m = grammar.parse_string("ab", ParseOptions::default());
        let root = tree(&m, false);
        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].tag().as_deref(), Some("a"));
        assert_eq!(children[0].value(), "a");
        assert_eq!(children[1].tag().as_deref(), Some("b"));
        assert_eq!(children[1].value(), "b");
    }

    #[test]
    fn pruning_collapses_an_untagged_wrapper_with_one_child() {
        let inner = sequence(vec![literal_char('a').tag("a"), literal_char('b')]).unwrap();
        let grammar = sequence(vec![inner, literal_char('c').tag("c")]).unwrap();
        let m = grammar.parse_string("abc", ParseOptions::default());
        let pruned = tree(&m, true);
        // The inner sequence carries no tag of its own and has exactly one
        // tagged child ("b" is untagged and gets dropped), so it collapses
        // away rather than appearing as its own node.
        let children = pruned.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].tag().as_deref(), Some("a"));
        assert_eq!(children[1].tag().as_deref(), Some("c"));
    }

    #[test]
    fn pruning_keeps_an_untagged_wrapper_with_multiple_children() {
        let inner = sequence(vec![
            literal_char('a').tag("a"),
            literal_char('b').tag("b"),
        ])
        .unwrap();
        let m = inner.parse_string("ab", ParseOptions::default());
        let pruned = tree(&m, true);
        // The outermost sequence itself carries no tag, but it has two
        // tagged children with nothing to collapse into, so it stays.
        assert_eq!(pruned.children().len(), 2);
    }
}
