//! The [`Parser`] value and the combinator algebra built on top of it.
//!
//! A grammar is a graph of [`Parser`] nodes. The graph is immutable once
//! built (except for [`forward`] holders, which exist precisely to allow
//! cyclic/self-referential grammars) and may be shared across threads for
//! independent parses, since all the mutable state of a parse lives on the
//! [`Scanner`](crate::Scanner), not on the parser graph.

mod composites;
mod ops;
mod terminals;

pub use composites::*;
pub use terminals::*;

use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::GrammarError;
use crate::match_::ParserMatch;
use crate::scanner::Scanner;

/// Identifies a [`Parser`] node for the lifetime of the process. Used as the
/// key for the scanner's per-parser, per-parse context map (see the
/// recursion combinator's left-recursion guard) and to compare parser
/// identity without requiring `Parser: Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParserId(u64);

impl ParserId {
    fn next() -> ParserId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ParserId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The scope-tree role a parser's matches play once a chain is folded into a
/// [`ScopeNode`](crate::result::ScopeNode) hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeKind {
    /// Not part of the scope hierarchy; contributes only a data leaf (or
    /// nothing, if untagged).
    #[default]
    None,
    /// Opens a new scope; the match becomes that scope's `opening_match`.
    OpenScope,
    /// Closes the innermost open scope; the match becomes its
    /// `closing_match`.
    CloseScope,
    /// Opens and immediately closes a scope whose right edge is this match's
    /// `right`, e.g. a self-closing tag.
    Enclosed,
    /// Re-roots its surrounding siblings around itself, folding an
    /// operator-style flat sequence into nested binary subtrees.
    Pivot,
}

/// A node in a parser graph.
///
/// Cloning a `Parser` is cheap (an `Rc` bump): the graph is reference
/// counted so the same sub-grammar can be reused from multiple places
/// without duplicating it.
#[derive(Clone)]
pub struct Parser(pub(crate) Rc<ParserNode>);

pub(crate) struct ParserNode {
    pub(crate) id: ParserId,
    pub(crate) kind: ParserKind,
    pub(crate) tag: Option<String>,
    pub(crate) scope: ScopeKind,
}

/// The closed set of combinators. Kept as a single enum (rather than open
/// trait objects) so matching over it stays exhaustive and the whole graph
/// can be walked, trampolined, or introspected uniformly.
pub(crate) enum ParserKind {
    LiteralChar(char),
    LiteralString {
        text: String,
        case_sensitive: bool,
    },
    CharacterInRanges {
        ranges: Vec<(char, char)>,
        exclusions: Vec<char>,
    },
    AnyCharacter,
    EndOfInput,
    EmptyMatch,
    RegularExpression(regex::Regex),
    RemainingLength {
        min: usize,
        max: Option<usize>,
    },
    Sequence(Vec<Parser>),
    Union(Vec<Parser>),
    Exclusive(Parser, Parser),
    Intersection(Parser, Parser),
    Difference(Parser, Parser),
    Repetition {
        inner: Parser,
        min: usize,
        max: Option<usize>,
    },
    DelimitedList {
        item: Parser,
        delimiter: Parser,
    },
    TerminatedList {
        item: Parser,
        terminator: Parser,
    },
    Recursion(Rc<composites::ForwardSlot>),
}

impl Parser {
    pub(crate) fn new(kind: ParserKind) -> Parser {
        Parser(Rc::new(ParserNode {
            id: ParserId::next(),
            kind,
            tag: None,
            scope: ScopeKind::None,
        }))
    }

    /// This parser's identity, stable across clones.
    pub fn id(&self) -> ParserId {
        self.0.id
    }

    /// Attach a tag (a grouping key used by [`tagged_tokens`] and the scope
    /// tree builder) to this parser.
    ///
    /// Builds a private copy of the node if the parser graph has already
    /// been shared (`Rc` strong count > 1), so tagging never mutates a
    /// sibling's view of a reused sub-grammar.
    pub fn tag(self, name: impl Into<String>) -> Parser {
        self.with_node(|node| node.tag = Some(name.into()))
    }

    /// Attach a [`ScopeKind`] to this parser.
    pub fn scope(self, kind: ScopeKind) -> Parser {
        self.with_node(|node| node.scope = kind)
    }

    fn with_node(mut self, f: impl FnOnce(&mut ParserNode)) -> Parser {
        match Rc::get_mut(&mut self.0) {
            Some(node) => {
                f(node);
                self
            }
            None => {
                let mut copy = ParserNode {
                    id: self.0.id,
                    kind: self.0.kind.shallow_clone(),
                    tag: self.0.tag.clone(),
                    scope: self.0.scope,
                };
                f(&mut copy);
                Parser(Rc::new(copy))
            }
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<ParserNode> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn from_weak(weak: &Weak<ParserNode>) -> Option<Parser> {
        weak.upgrade().map(Parser)
    }

    /// The tag attached via [`Parser::tag`], if any.
    pub fn tag_name(&self) -> Option<&str> {
        self.0.tag.as_deref()
    }

    /// The scope kind attached via [`Parser::scope`].
    pub fn scope_kind(&self) -> ScopeKind {
        self.0.scope
    }

    /// True if this parser can legally match zero-length input and thus be
    /// skipped entirely, e.g. `opt(p)` or a `Repetition` with `min == 0`.
    pub fn is_optional(&self) -> bool {
        match &self.0.kind {
            ParserKind::EmptyMatch => true,
            ParserKind::Repetition { min, .. } => *min == 0,
            ParserKind::Recursion(slot) => slot
                .target()
                .map(|p| p.is_optional())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// The parser's direct children, for diagnostics and introspection.
    pub fn child_parsers(&self) -> Vec<Parser> {
        match &self.0.kind {
            ParserKind::Sequence(children) | ParserKind::Union(children) => children.clone(),
            ParserKind::Exclusive(a, b)
            | ParserKind::Intersection(a, b)
            | ParserKind::Difference(a, b) => vec![a.clone(), b.clone()],
            ParserKind::Repetition { inner, .. } => vec![inner.clone()],
            ParserKind::DelimitedList { item, delimiter } => {
                vec![item.clone(), delimiter.clone()]
            }
            ParserKind::TerminatedList { item, terminator } => {
                vec![item.clone(), terminator.clone()]
            }
            ParserKind::Recursion(slot) => slot.target().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// A short human-readable description, used to build "expected ..."
    /// diagnostics. `depth` bounds recursion into children so a cyclic
    /// (`forward`) grammar can't recurse forever just to describe itself.
    pub fn short_description(&self, depth: usize) -> String {
        if let Some(tag) = self.tag_name() {
            return tag.to_string();
        }
        describe(&self.0.kind, depth)
    }

    /// Parse `input` with this parser as the root, via a freshly built
    /// [`Scanner`] configured from `opts`. The scanner is marked
    /// [`complete`](Scanner::complete) once parsing returns; the resulting
    /// match (and anything built from it) remains fully readable.
    pub fn parse_string(&self, input: &str, opts: crate::scanner::ParseOptions) -> ParserMatch {
        let scanner = Scanner::new(input, opts);
        let result = self.parse(&scanner, None);
        scanner.complete();
        result
    }

    /// Parse against an already-constructed scanner, continuing from
    /// `previous` (or from the start of input if `None`). This is the
    /// low-level entry point; [`Parser::parse_string`] is the common case.
    ///
    /// # Panics
    ///
    /// Panics if `scanner` was already [`complete`](Scanner::complete)d, or
    /// if the grammar contains a [`forward`] reference that was never
    /// [`assign`](Parser::assign)ed a target. Both are grammar-author bugs
    /// caught eagerly, not recoverable parse failures.
    pub fn parse(&self, scanner: &Scanner, previous: Option<ParserMatch>) -> ParserMatch {
        if let Err(e) = scanner.ensure_not_completed() {
            panic!("{e}");
        }
        if let Err(e) = self.validate_assigned(&mut HashSet::new()) {
            panic!("{e}");
        }
        self.try_match(scanner, previous, true)
    }

    /// Walks the whole grammar graph once, checking that every `forward`
    /// reference reachable from `self` has been assigned a target. `seen`
    /// guards against revisiting a node already checked, which also makes
    /// this terminate on cyclic (recursive) grammars.
    fn validate_assigned(&self, seen: &mut HashSet<ParserId>) -> Result<(), GrammarError> {
        if !seen.insert(self.id()) {
            return Ok(());
        }
        if let ParserKind::Recursion(slot) = &self.0.kind {
            match slot.target() {
                Some(t) => t.validate_assigned(seen)?,
                None => return Err(GrammarError::UnassignedForwardReference),
            }
        } else {
            for child in self.child_parsers() {
                child.validate_assigned(seen)?;
            }
        }
        Ok(())
    }

    pub(crate) fn try_match(
        &self,
        scanner: &Scanner,
        previous: Option<ParserMatch>,
        allow_auto_advance: bool,
    ) -> ParserMatch {
        let previous = if allow_auto_advance {
            Some(scanner.do_auto_advance(previous.as_ref()))
        } else {
            previous
        };
        let m = match &self.0.kind {
            ParserKind::LiteralChar(_)
            | ParserKind::LiteralString { .. }
            | ParserKind::CharacterInRanges { .. }
            | ParserKind::AnyCharacter
            | ParserKind::EndOfInput
            | ParserKind::EmptyMatch
            | ParserKind::RegularExpression(_)
            | ParserKind::RemainingLength { .. } => {
                terminals::try_match_terminal(self, &self.0.kind, scanner, previous.as_ref())
            }
            ParserKind::Sequence(children) => {
                composites::match_sequence(self, children, scanner, previous)
            }
            ParserKind::Union(children) => composites::match_union(self, children, scanner, previous),
            ParserKind::Exclusive(a, b) => composites::match_exclusive(self, a, b, scanner, previous),
            ParserKind::Intersection(a, b) => {
                composites::match_intersection(self, a, b, scanner, previous)
            }
            ParserKind::Difference(a, b) => composites::match_difference(self, a, b, scanner, previous),
            ParserKind::Repetition { inner, min, max } => {
                composites::match_repetition(self, inner, *min, *max, scanner, previous)
            }
            ParserKind::DelimitedList { item, delimiter } => {
                composites::match_delimited_list(self, item, delimiter, scanner, previous)
            }
            ParserKind::TerminatedList { item, terminator } => {
                composites::match_terminated_list(self, item, terminator, scanner, previous)
            }
            ParserKind::Recursion(slot) => composites::match_recursion(self, slot, scanner, previous),
        };
        m.with_through(self.clone())
    }
}

impl ParserKind {
    /// A cheap clone used only by [`Parser::with_node`] when a shared node
    /// needs tag/scope metadata attached without disturbing the original.
    /// Children are `Parser`s, so this is an `Rc` bump per child, not a deep
    /// copy of the grammar.
    fn shallow_clone(&self) -> ParserKind {
        match self {
            ParserKind::LiteralChar(c) => ParserKind::LiteralChar(*c),
            ParserKind::LiteralString { text, case_sensitive } => ParserKind::LiteralString {
                text: text.clone(),
                case_sensitive: *case_sensitive,
            },
            ParserKind::CharacterInRanges { ranges, exclusions } => ParserKind::CharacterInRanges {
                ranges: ranges.clone(),
                exclusions: exclusions.clone(),
            },
            ParserKind::AnyCharacter => ParserKind::AnyCharacter,
            ParserKind::EndOfInput => ParserKind::EndOfInput,
            ParserKind::EmptyMatch => ParserKind::EmptyMatch,
            ParserKind::RegularExpression(re) => ParserKind::RegularExpression(re.clone()),
            ParserKind::RemainingLength { min, max } => ParserKind::RemainingLength {
                min: *min,
                max: *max,
            },
            ParserKind::Sequence(v) => ParserKind::Sequence(v.clone()),
            ParserKind::Union(v) => ParserKind::Union(v.clone()),
            ParserKind::Exclusive(a, b) => ParserKind::Exclusive(a.clone(), b.clone()),
            ParserKind::Intersection(a, b) => ParserKind::Intersection(a.clone(), b.clone()),
            ParserKind::Difference(a, b) => ParserKind::Difference(a.clone(), b.clone()),
            ParserKind::Repetition { inner, min, max } => ParserKind::Repetition {
                inner: inner.clone(),
                min: *min,
                max: *max,
            },
            ParserKind::DelimitedList { item, delimiter } => ParserKind::DelimitedList {
                item: item.clone(),
                delimiter: delimiter.clone(),
            },
            ParserKind::TerminatedList { item, terminator } => ParserKind::TerminatedList {
                item: item.clone(),
                terminator: terminator.clone(),
            },
            ParserKind::Recursion(slot) => ParserKind::Recursion(slot.clone()),
        }
    }
}

fn describe(kind: &ParserKind, depth: usize) -> String {
    match kind {
        ParserKind::LiteralChar(c) => format!("'{c}'"),
        ParserKind::LiteralString { text, .. } => format!("'{text}'"),
        ParserKind::CharacterInRanges { .. } => "<char set>".to_string(),
        ParserKind::AnyCharacter => "<any char>".to_string(),
        ParserKind::EndOfInput => "<end of input>".to_string(),
        ParserKind::EmptyMatch => "<empty>".to_string(),
        ParserKind::RegularExpression(re) => format!("/{}/", re.as_str()),
        ParserKind::RemainingLength { min, max } => {
            format!("<{min}..{max:?} remaining chars>")
        }
        _ if depth == 0 => "<...>".to_string(),
        ParserKind::Sequence(children) => join_descriptions(children, depth, " "),
        ParserKind::Union(children) => join_descriptions(children, depth, " | "),
        ParserKind::Exclusive(a, b) => format!(
            "{} ^ {}",
            a.short_description(depth - 1),
            b.short_description(depth - 1)
        ),
        ParserKind::Intersection(a, b) => format!(
            "{} & {}",
            a.short_description(depth - 1),
            b.short_description(depth - 1)
        ),
        ParserKind::Difference(a, b) => format!(
            "{} - {}",
            a.short_description(depth - 1),
            b.short_description(depth - 1)
        ),
        ParserKind::Repetition { inner, min, max } => {
            format!("{}{{{},{:?}}}", inner.short_description(depth - 1), min, max)
        }
        ParserKind::DelimitedList { item, delimiter } => format!(
            "{} % {}",
            item.short_description(depth - 1),
            delimiter.short_description(depth - 1)
        ),
        ParserKind::TerminatedList { item, terminator } => format!(
            "{} < {}",
            item.short_description(depth - 1),
            terminator.short_description(depth - 1)
        ),
        ParserKind::Recursion(slot) => slot
            .target()
            .map(|p| p.short_description(depth - 1))
            .unwrap_or_else(|| "<unassigned forward reference>".to_string()),
    }
}

fn join_descriptions(children: &[Parser], depth: usize, sep: &str) -> String {
    children
        .iter()
        .map(|c| c.short_description(depth - 1))
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parser({})", self.short_description(4))
    }
}
