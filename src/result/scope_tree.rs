//! Builds a tag/scope hierarchy out of a flat match chain: the shape an
//! application wants when its grammar marks explicit open/close/pivot
//! boundaries (brackets, blocks, operator precedence) rather than relying
//! on parser structure alone (see [`tree`](super::tree) for that view).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::match_::ParserMatch;
use crate::parser::ScopeKind;

/// What role a [`ScopeNode`] plays in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeNodeKind {
    /// The tree root; has no match of its own.
    Root,
    /// A plain tagged leaf contributed by a `None`-scoped (or, before the
    /// pivot rewrite runs, `Pivot`-scoped) match.
    Data,
    /// A scope boundary: either an explicit `OpenScope`/`CloseScope` pair,
    /// an `Enclosed` self-closing span, or a pivot folded by the rewrite.
    ScopeChange,
}

struct Inner {
    kind: ScopeNodeKind,
    data_match: Option<ParserMatch>,
    opening_match: Option<ParserMatch>,
    closing_match: Option<ParserMatch>,
    parent: Option<Weak<RefCell<Inner>>>,
    children: Vec<ScopeNode>,
}

/// A node in the tree produced by [`scope_tree`].
///
/// Cheap to clone (an `Rc` bump); every clone refers to the same node, so
/// holding on to a child after its parent goes out of scope is fine — the
/// tree is kept alive from whichever end is still reachable.
#[derive(Clone)]
pub struct ScopeNode(Rc<RefCell<Inner>>);

impl ScopeNode {
    fn new(kind: ScopeNodeKind, parent: Option<&ScopeNode>) -> ScopeNode {
        ScopeNode(Rc::new(RefCell::new(Inner {
            kind,
            data_match: None,
            opening_match: None,
            closing_match: None,
            parent: parent.map(|p| Rc::downgrade(&p.0)),
            children: Vec::new(),
        })))
    }

    pub fn kind(&self) -> ScopeNodeKind {
        self.0.borrow().kind
    }

    pub fn data_match(&self) -> Option<ParserMatch> {
        self.0.borrow().data_match.clone()
    }

    pub fn opening_match(&self) -> Option<ParserMatch> {
        self.0.borrow().opening_match.clone()
    }

    pub fn closing_match(&self) -> Option<ParserMatch> {
        self.0.borrow().closing_match.clone()
    }

    /// The enclosing scope, or `None` at the root.
    pub fn parent(&self) -> Option<ScopeNode> {
        self.0.borrow().parent.as_ref().and_then(Weak::upgrade).map(ScopeNode)
    }

    pub fn children(&self) -> Vec<ScopeNode> {
        self.0.borrow().children.clone()
    }

    /// The sibling immediately before this one in the parent's child list,
    /// derived from position rather than stored as a standalone pointer.
    pub fn prev_sibling(&self) -> Option<ScopeNode> {
        let siblings = self.parent()?.children();
        let i = siblings.iter().position(|s| s == self)?;
        i.checked_sub(1).map(|i| siblings[i].clone())
    }

    /// The sibling immediately after this one.
    pub fn next_sibling(&self) -> Option<ScopeNode> {
        let siblings = self.parent()?.children();
        let i = siblings.iter().position(|s| s == self)?;
        siblings.get(i + 1).cloned()
    }

    /// True if this node opened a scope that was never closed: a dangling
    /// `OpenScope` with no matching `CloseScope` before the chain ended.
    pub fn is_unbalanced(&self) -> bool {
        let inner = self.0.borrow();
        inner.opening_match.is_some() && inner.closing_match.is_none()
    }

    fn append_child(&self, child: ScopeNode) {
        self.0.borrow_mut().children.push(child);
    }

    fn set_children(&self, children: Vec<ScopeNode>) {
        self.0.borrow_mut().children = children;
    }

    fn set_closing_match(&self, m: ParserMatch) {
        self.0.borrow_mut().closing_match = Some(m);
    }
}

impl PartialEq for ScopeNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Builds a [`ScopeNode`] hierarchy from `m`'s match chain, per the state
/// machine and pivot rewrite described for the scope builder: a
/// depth-first walk of the chain, filtered to non-empty matches that carry
/// a tag or a non-`None` scope, threading a `cursor` through
/// `OpenScope`/`CloseScope`/`Enclosed` events and deferring `Pivot` nodes
/// to a post-pass.
pub fn scope_tree(m: &ParserMatch) -> ScopeNode {
    let root = ScopeNode::new(ScopeNodeKind::Root, None);
    let mut cursor = root.clone();
    let mut faulted = false;

    for step in m.chain() {
        if faulted {
            break;
        }
        if step.is_empty() {
            continue;
        }
        let tag = step.tag();
        let scope = step.scope();
        if tag.is_none() && scope == ScopeKind::None {
            continue;
        }

        match scope {
            ScopeKind::None | ScopeKind::Pivot => {
                let node = ScopeNode::new(ScopeNodeKind::Data, Some(&cursor));
                node.0.borrow_mut().data_match = Some(step);
                cursor.append_child(node);
            }
            ScopeKind::OpenScope => {
                let node = ScopeNode::new(ScopeNodeKind::ScopeChange, Some(&cursor));
                node.0.borrow_mut().opening_match = Some(step);
                cursor.append_child(node.clone());
                cursor = node;
            }
            ScopeKind::CloseScope => {
                cursor.set_closing_match(step);
                match cursor.parent() {
                    Some(parent) => cursor = parent,
                    // More closes than opens: the chain is malformed past
                    // this point, so stop rather than attach further
                    // events to a cursor that no longer means anything.
                    None => faulted = true,
                }
            }
            ScopeKind::Enclosed => {
                let node = ScopeNode::new(ScopeNodeKind::ScopeChange, Some(&cursor));
                {
                    let mut inner = node.0.borrow_mut();
                    inner.opening_match = Some(step.clone());
                    inner.closing_match = Some(step);
                }
                cursor.append_child(node);
            }
        }
    }

    pivot_rewrite(&root);
    root
}

/// Recursively folds `Pivot`-scoped `Data` children of every node into
/// nested `ScopeChange` subtrees, left-associatively: each pivot becomes a
/// node whose children are everything accumulated since the previous
/// pivot (or the start of the list) and everything up to the next pivot
/// (or the end).
fn pivot_rewrite(node: &ScopeNode) {
    let children = node.children();
    for child in &children {
        pivot_rewrite(child);
    }
    let new_children = fold_pivots(children);
    for child in &new_children {
        child.0.borrow_mut().parent = Some(Rc::downgrade(&node.0));
    }
    node.set_children(new_children);
}

fn is_pivot(node: &ScopeNode) -> bool {
    node.kind() == ScopeNodeKind::Data
        && node
            .data_match()
            .map(|m| m.scope() == ScopeKind::Pivot)
            .unwrap_or(false)
}

fn fold_pivots(children: Vec<ScopeNode>) -> Vec<ScopeNode> {
    let mut runs: Vec<Vec<ScopeNode>> = vec![Vec::new()];
    let mut pivots: Vec<ScopeNode> = Vec::new();
    for child in children {
        if is_pivot(&child) {
            pivots.push(child);
            runs.push(Vec::new());
        } else {
            runs.last_mut().expect("runs always has at least one entry").push(child);
        }
    }
    if pivots.is_empty() {
        return runs.into_iter().next().unwrap_or_default();
    }

    let mut left = runs[0].clone();
    for (i, pivot) in pivots.into_iter().enumerate() {
        let right = runs[i + 1].clone();
        let folded = ScopeNode::new(ScopeNodeKind::ScopeChange, None);
        folded.0.borrow_mut().data_match = pivot.data_match();
        let mut operands = left;
        operands.extend(right);
        for operand in &operands {
            operand.0.borrow_mut().parent = Some(Rc::downgrade(&folded.0));
        }
        folded.set_children(operands);
        left = vec![folded];
    }
    left
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::{char_range, choice, literal_char, sequence, zero_or_more};
    use crate::scanner::ParseOptions;

    #[test]
    fn consecutive_pivots_fold_left_associatively() {
        let digit = char_range('0', '9').tag("digit");
        let plus = literal_char('+').tag("op").scope(ScopeKind::Pivot);
        let grammar = sequence(vec![
            digit.clone(),
            zero_or_more(sequence(vec![plus, digit]).unwrap()),
        ])
        .unwrap();

        let m = grammar.parse_string("1+2+3", ParseOptions::default());
        assert!(m.is_success());
        let root = scope_tree(&m);
        // Left fold: ((1 + 2) + 3), so the outermost node's right-hand
        // operand is the bare "3" and its left-hand operand is itself a
        // folded node.
        let outer = &root.children()[0];
        assert_eq!(outer.kind(), ScopeNodeKind::ScopeChange);
        let children = outer.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind(), ScopeNodeKind::ScopeChange);
        assert_eq!(children[1].data_match().unwrap().value(), "3");
    }

    #[test]
    fn scope_change_closes_and_reopens_the_cursor_correctly() {
        let open = literal_char('(').scope(ScopeKind::OpenScope);
        let close = literal_char(')').scope(ScopeKind::CloseScope);
        let content = char_range('a', 'c').tag("content");
        let token = choice(vec![content, open, close]).unwrap();
        let grammar = zero_or_more(token);

        let m = grammar.parse_string("(a)", ParseOptions::default());
        assert!(m.is_success());
        let root = scope_tree(&m);
        let group = &root.children()[0];
        assert_eq!(group.kind(), ScopeNodeKind::ScopeChange);
        assert!(!group.is_unbalanced());
        assert_eq!(group.children().len(), 1);
    }

    #[test]
    fn a_dangling_open_scope_is_reported_unbalanced() {
        let open = literal_char('(').scope(ScopeKind::OpenScope);
        let close = literal_char(')').scope(ScopeKind::CloseScope);
        let content = char_range('a', 'c').tag("content");
        let token = choice(vec![content, open, close]).unwrap();
        let grammar = zero_or_more(token);

        let m = grammar.parse_string("(a", ParseOptions::default());
        assert!(m.is_success());
        let root = scope_tree(&m);
        let group = &root.children()[0];
        assert!(group.is_unbalanced());
        assert!(group.closing_match().is_none());
    }
}
