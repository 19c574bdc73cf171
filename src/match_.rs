//! [`ParserMatch`]: the single value type every combinator produces,
//! success or failure alike.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::parser::{Parser, ParserNode, ScopeKind};
use crate::scanner::Scanner;

/// An immutable record of what happened when a [`Parser`] was tried at a
/// position: either a success (`length >= 0`) covering `[offset, right)`, or
/// a failure (`length == -1`) that carries no span.
///
/// `ParserMatch` is cheap to clone (an `Rc` bump) and, once constructed, is
/// never mutated except for two narrow exceptions: attaching a closing
/// match to a [`ScopeNode`](crate::result::ScopeNode) during scope-tree
/// construction, and recording the combinator that most recently "claimed"
/// a match as it bubbles up through tagged/scoped combinator boundaries
/// (see [`ParserMatch::tag`]).
#[derive(Clone)]
pub struct ParserMatch(pub(crate) Rc<MatchInner>);

pub(crate) struct MatchInner {
    source_parser: Weak<ParserNode>,
    scanner: Weak<crate::scanner::ScannerData>,
    offset: u32,
    length: i32,
    previous: Option<ParserMatch>,
    through: RefCell<Option<Weak<ParserNode>>>,
    closing: RefCell<Option<ParserMatch>>,
}

impl ParserMatch {
    pub(crate) fn new(
        parser: &Parser,
        scanner: &Scanner,
        offset: u32,
        length: i32,
        previous: Option<ParserMatch>,
    ) -> ParserMatch {
        ParserMatch(Rc::new(MatchInner {
            source_parser: parser.downgrade(),
            scanner: scanner.downgrade(),
            offset,
            length,
            previous,
            through: RefCell::new(None),
            closing: RefCell::new(None),
        }))
    }

    /// True if this is a successful match (`length >= 0`).
    pub fn is_success(&self) -> bool {
        self.0.length >= 0
    }

    /// True if this is a failed attempt (`length == -1`).
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// True if this is a success that consumed no input.
    pub fn is_empty(&self) -> bool {
        self.is_success() && self.0.length == 0
    }

    /// The position this match (or attempt) started at.
    pub fn offset(&self) -> u32 {
        self.0.offset
    }

    /// The raw, possibly-negative length: `-1` for a failure, `>= 0` for a
    /// success.
    pub fn raw_length(&self) -> i32 {
        self.0.length
    }

    /// The position immediately after this match: `offset + max(length, 0)`.
    pub fn right(&self) -> u32 {
        self.0.offset + self.0.length.max(0) as u32
    }

    /// The parser that produced this match.
    pub fn source_parser(&self) -> Option<Parser> {
        Parser::from_weak(&self.0.source_parser)
    }

    /// The scanner this match belongs to.
    pub fn scanner(&self) -> Scanner {
        self.0
            .scanner
            .upgrade()
            .map(Scanner::from_rc)
            .expect("scanner dropped before its matches")
    }

    /// The match immediately preceding this one in the same parse chain.
    pub fn previous(&self) -> Option<&ParserMatch> {
        self.0.previous.as_ref()
    }

    /// The substring `[offset, right)` of the scanner's transformed view.
    pub fn value(&self) -> String {
        if self.is_failure() {
            return String::new();
        }
        self.scanner()
            .substring(self.offset(), self.0.length)
            .to_string()
    }

    /// The substring `[offset, right)` of the scanner's original,
    /// untransformed view.
    pub fn untransformed_value(&self) -> String {
        if self.is_failure() {
            return String::new();
        }
        self.scanner()
            .untransformed_substring(self.offset(), self.0.length)
            .to_string()
    }

    /// Whichever parser should be consulted for tag/scope purposes: the
    /// combinator that most recently claimed this match at a tagged or
    /// scoped boundary, falling back to the parser that actually produced
    /// it.
    fn effective_parser(&self) -> Option<Parser> {
        if let Some(through) = self.0.through.borrow().as_ref() {
            if let Some(p) = Parser::from_weak(through) {
                return Some(p);
            }
        }
        self.source_parser()
    }

    /// The tag of the effective parser (see [`ParserMatch::effective_parser`]).
    pub fn tag(&self) -> Option<String> {
        self.effective_parser()?.tag_name().map(str::to_string)
    }

    /// The scope kind of the effective parser.
    pub fn scope(&self) -> ScopeKind {
        self.effective_parser()
            .map(|p| p.scope_kind())
            .unwrap_or_default()
    }

    /// Record that `parser` claimed this match at a combinator boundary. A
    /// no-op unless `parser` carries a tag or scope of its own, so plain
    /// structural combinators (an untagged `seq`/`or`/`repeat`) never erase
    /// the tag of whichever terminal actually produced the match.
    pub(crate) fn with_through(self, parser: Parser) -> ParserMatch {
        if parser.tag_name().is_some() || parser.scope_kind() != ScopeKind::None {
            *self.0.through.borrow_mut() = Some(parser.downgrade());
        }
        self
    }

    /// Same start-and-end position as `other` (used by the repetition and
    /// recursion combinators' no-progress guards).
    pub(crate) fn same_span(&self, other: &ParserMatch) -> bool {
        self.offset() == other.offset() && self.right() == other.right()
    }

    /// The closing match attached during scope-tree construction, if any
    /// (see [`ScopeNode`](crate::result::ScopeNode)).
    pub(crate) fn closing_match(&self) -> Option<ParserMatch> {
        self.0.closing.borrow().clone()
    }

    pub(crate) fn set_closing_match(&self, closing: ParserMatch) {
        *self.0.closing.borrow_mut() = Some(closing);
    }

    /// Walks `previous` links back to the root, yielding matches in parse
    /// order (oldest first).
    pub fn chain(&self) -> Vec<ParserMatch> {
        let mut stack = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(m) = cur {
            cur = m.previous().cloned();
            stack.push(m);
        }
        stack.reverse();
        stack
    }
}

impl fmt::Debug for ParserMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_failure() {
            write!(f, "Fail@{}", self.offset())
        } else {
            write!(
                f,
                "Match[{}, {})={:?}",
                self.offset(),
                self.right(),
                self.value()
            )
        }
    }
}
