//! The combinators that build larger parsers out of smaller ones:
//! sequencing, ordered choice, set-like operations, repetition, the two
//! list shapes, and the forward reference used for recursive grammars.

use std::cell::RefCell;
use std::collections::HashSet;

use log::trace;

use crate::error::GrammarError;
use crate::match_::ParserMatch;
use crate::scanner::Scanner;

use super::{Parser, ParserId, ParserKind};

/// Runs `a` then `b` in order, threading `a`'s match forward as `b`'s
/// cursor. The combined match spans from `a`'s start to `b`'s end.
pub fn seq(a: Parser, b: Parser) -> Parser {
    sequence(vec![a, b]).expect("seq() is never empty")
}

/// An n-ary generalization of [`seq`]. Fails to build if `items` is empty.
pub fn sequence(items: Vec<Parser>) -> Result<Parser, GrammarError> {
    if items.is_empty() {
        return Err(GrammarError::MissingChild { combinator: "Sequence" });
    }
    Ok(Parser::new(ParserKind::Sequence(items)))
}

/// Ordered choice: try `a`; if it fails, try `b`. Never tries `b` once `a`
/// has succeeded.
pub fn or(a: Parser, b: Parser) -> Parser {
    choice(vec![a, b]).expect("or() is never empty")
}

/// An n-ary generalization of [`or`], trying each alternative in order.
pub fn choice(items: Vec<Parser>) -> Result<Parser, GrammarError> {
    if items.is_empty() {
        return Err(GrammarError::MissingChild { combinator: "Union" });
    }
    Ok(Parser::new(ParserKind::Union(items)))
}

/// Exactly one of `a`, `b` must match at the same cursor; if both or
/// neither do, the whole combinator fails.
pub fn xor(a: Parser, b: Parser) -> Parser {
    Parser::new(ParserKind::Exclusive(a, b))
}

/// Both `a` and `b` must match starting at the same cursor; the combined
/// match spans the union of their two ranges.
pub fn and(a: Parser, b: Parser) -> Parser {
    Parser::new(ParserKind::Intersection(a, b))
}

/// `a` must match and `b` must not, at the same cursor. Returns `a`'s span.
pub fn diff(a: Parser, b: Parser) -> Parser {
    Parser::new(ParserKind::Difference(a, b))
}

/// Greedily matches `p` between `min` and `max` (inclusive) times.
/// `max = None` means unbounded.
pub fn repeat(p: Parser, min: usize, max: Option<usize>) -> Result<Parser, GrammarError> {
    if let Some(max) = max {
        if max < min {
            return Err(GrammarError::InvalidRepetitionBounds { min, max });
        }
    }
    Ok(Parser::new(ParserKind::Repetition { inner: p, min, max }))
}

/// `repeat(p, 0, Some(1))`.
pub fn opt(p: Parser) -> Parser {
    repeat(p, 0, Some(1)).expect("0..=1 is always valid")
}

/// `repeat(p, 0, None)`.
pub fn zero_or_more(p: Parser) -> Parser {
    repeat(p, 0, None).expect("0.. is always valid")
}

/// `repeat(p, 1, None)`.
pub fn one_or_more(p: Parser) -> Parser {
    repeat(p, 1, None).expect("1.. is always valid")
}

/// Matches `item (delimiter item)*`: at least one `item`, with `delimiter`
/// between successive items. A trailing `delimiter` is not consumed.
pub fn delimited(item: Parser, delimiter: Parser) -> Parser {
    Parser::new(ParserKind::DelimitedList { item, delimiter })
}

/// Matches `(item terminator)+`: one or more `item` followed by
/// `terminator`. An `item` with no following `terminator` is not consumed.
pub fn terminated(item: Parser, terminator: Parser) -> Parser {
    Parser::new(ParserKind::TerminatedList { item, terminator })
}

/// A mutable forward reference, for self-referential (recursive) grammars.
/// Use [`Parser::assign`] once the referenced grammar is built:
///
/// ```
/// use pegmatite::{forward, literal_char, opt, seq};
///
/// let digit = pegmatite::char_range('0', '9');
/// let e = forward();
/// e.clone()
///     .assign(seq(digit.clone(), opt(seq(literal_char('+'), e.clone()))))
///     .unwrap();
/// ```
pub fn forward() -> Parser {
    Parser::new(ParserKind::Recursion(std::rc::Rc::new(ForwardSlot {
        target: RefCell::new(None),
    })))
}

/// The mutable cell behind a [`forward`] reference.
pub struct ForwardSlot {
    target: RefCell<Option<Parser>>,
}

impl ForwardSlot {
    pub(crate) fn target(&self) -> Option<Parser> {
        self.target.borrow().clone()
    }
}

impl Parser {
    /// Assigns the grammar a [`forward`] reference stands for. Fails with
    /// [`GrammarError::UnboundedLeftRecursion`] if any reachable first step
    /// of `target` loops back to this same holder without first going
    /// through something that can consume input. The parse-time guard
    /// described in [`Recursion`](self) only ever stops a second identical
    /// attempt at the same position and falls back to whatever alternative
    /// is left — it cannot grow a proper left-associative match out of a
    /// directly left-recursive rule, so a shape like `e = e '+' digit |
    /// digit` is rejected here rather than silently parsing only one
    /// `digit`. Write that rule as `delimited(digit, literal_char('+'))`
    /// instead.
    ///
    /// # Panics
    ///
    /// Panics if called on a `Parser` that isn't a [`forward`] holder.
    pub fn assign(&self, target: Parser) -> Result<(), GrammarError> {
        let ParserKind::Recursion(slot) = &self.0.kind else {
            panic!("Parser::assign called on a parser that is not a forward reference");
        };
        if could_recurse_immediately(&target, self.id(), 64, &mut HashSet::new()) {
            return Err(GrammarError::UnboundedLeftRecursion);
        }
        *slot.target.borrow_mut() = Some(target);
        Ok(())
    }
}

/// True iff some reachable first step of `p` passes back through the
/// `forward` holder identified by `holder_id` before anything else could
/// consume input — i.e. `p` admits at least one direct left-recursive
/// path. Bounded by `depth` since the grammar may still contain other,
/// already-resolved cycles.
fn could_recurse_immediately(
    p: &Parser,
    holder_id: ParserId,
    depth: usize,
    seen: &mut HashSet<ParserId>,
) -> bool {
    if depth == 0 {
        return false;
    }
    match &p.0.kind {
        ParserKind::Recursion(slot) => {
            if p.id() == holder_id {
                return true;
            }
            if !seen.insert(p.id()) {
                return false;
            }
            match slot.target() {
                Some(t) => could_recurse_immediately(&t, holder_id, depth - 1, seen),
                None => false,
            }
        }
        ParserKind::Sequence(children) => children
            .first()
            .map(|c| could_recurse_immediately(c, holder_id, depth - 1, seen))
            .unwrap_or(false),
        ParserKind::Union(children) => children
            .iter()
            .any(|c| could_recurse_immediately(c, holder_id, depth - 1, seen)),
        ParserKind::Exclusive(a, b) | ParserKind::Intersection(a, b) => {
            could_recurse_immediately(a, holder_id, depth - 1, seen)
                || could_recurse_immediately(b, holder_id, depth - 1, seen)
        }
        ParserKind::Difference(a, _) => could_recurse_immediately(a, holder_id, depth - 1, seen),
        ParserKind::Repetition { inner, .. } => {
            could_recurse_immediately(inner, holder_id, depth - 1, seen)
        }
        ParserKind::DelimitedList { item, .. } | ParserKind::TerminatedList { item, .. } => {
            could_recurse_immediately(item, holder_id, depth - 1, seen)
        }
        _ => false,
    }
}

pub(super) fn match_sequence(
    self_parser: &Parser,
    children: &[Parser],
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let mut current = previous;
    let mut first_offset = None;
    for child in children {
        let m = child.try_match(scanner, current, true);
        if m.is_failure() {
            return m;
        }
        first_offset.get_or_insert_with(|| m.offset());
        current = Some(m);
    }
    let last = current.expect("Sequence always has at least one child");
    let offset = first_offset.expect("set on first iteration");
    scanner.create_match(self_parser, offset, span(offset, last.right()), Some(last))
}

pub(super) fn match_union(
    self_parser: &Parser,
    children: &[Parser],
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let mut last_failure = None;
    for child in children {
        let m = child.try_match(scanner, previous.clone(), true);
        if m.is_success() {
            return m;
        }
        last_failure = Some(m);
    }
    last_failure.unwrap_or_else(|| scanner.no_match(self_parser, previous.as_ref()))
}

pub(super) fn match_exclusive(
    self_parser: &Parser,
    a: &Parser,
    b: &Parser,
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let ma = a.try_match(scanner, previous.clone(), true);
    let mb = b.try_match(scanner, previous.clone(), true);
    match (ma.is_success(), mb.is_success()) {
        (true, true) | (false, false) => scanner.no_match(self_parser, previous.as_ref()),
        (true, false) => ma,
        (false, true) => mb,
    }
}

pub(super) fn match_intersection(
    self_parser: &Parser,
    a: &Parser,
    b: &Parser,
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let ma = a.try_match(scanner, previous.clone(), true);
    if ma.is_failure() {
        return ma;
    }
    let mb = b.try_match(scanner, previous.clone(), true);
    if mb.is_failure() {
        return mb;
    }
    let offset = ma.offset().min(mb.offset());
    let right = ma.right().max(mb.right());
    // `a` and `b` are evaluated in parallel against the same incoming
    // cursor, not sequentially, so neither has a well-defined place in the
    // singly-linked chain relative to the other; the synthesized match
    // simply replaces both, chained directly off whatever came before this
    // combinator ran (mirroring how `Difference` makes its excluded `b`
    // branch invisible to the chain).
    scanner.create_match(self_parser, offset, span(offset, right), previous)
}

pub(super) fn match_difference(
    self_parser: &Parser,
    a: &Parser,
    b: &Parser,
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let ma = a.try_match(scanner, previous.clone(), true);
    if ma.is_failure() {
        return ma;
    }
    let mb = b.try_match(scanner, previous.clone(), true);
    if mb.is_success() {
        scanner.no_match(self_parser, previous.as_ref())
    } else {
        ma
    }
}

pub(super) fn match_repetition(
    self_parser: &Parser,
    inner: &Parser,
    min: usize,
    max: Option<usize>,
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let start_cursor = previous.as_ref().map(|p| p.right()).unwrap_or(0);
    let mut current = previous.clone();
    let mut first_offset = None;
    let mut count = 0usize;

    loop {
        if let Some(max) = max {
            if count >= max {
                break;
            }
        }
        let cursor_before = current.as_ref().map(|p| p.right()).unwrap_or(0);
        let attempt = inner.try_match(scanner, current.clone(), true);
        if attempt.is_failure() {
            break;
        }
        if attempt.right() == cursor_before {
            // Zero-length, no forward progress: stop before counting this
            // attempt, so a `repeat(empty(), ...)` can never loop forever.
            break;
        }
        first_offset.get_or_insert_with(|| attempt.offset());
        current = Some(attempt);
        count += 1;
    }

    if count < min {
        return scanner.no_match(self_parser, previous.as_ref());
    }
    match current {
        Some(last) if count > 0 => {
            let offset = first_offset.expect("set alongside count > 0");
            scanner.create_match(self_parser, offset, span(offset, last.right()), Some(last))
        }
        _ => scanner.empty_match(self_parser, start_cursor, previous),
    }
}

pub(super) fn match_delimited_list(
    self_parser: &Parser,
    item: &Parser,
    delimiter: &Parser,
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let first = item.try_match(scanner, previous.clone(), true);
    if first.is_failure() {
        return first;
    }
    let offset = first.offset();
    let mut last_good = first.clone();
    let mut current = Some(first);

    loop {
        let d = delimiter.try_match(scanner, current.clone(), true);
        if d.is_failure() {
            break;
        }
        let next = item.try_match(scanner, Some(d), true);
        if next.is_failure() {
            // Trailing delimiter: rewind to after the last successful item.
            break;
        }
        last_good = next.clone();
        current = Some(next);
    }

    scanner.create_match(
        self_parser,
        offset,
        span(offset, last_good.right()),
        Some(last_good),
    )
}

pub(super) fn match_terminated_list(
    self_parser: &Parser,
    item: &Parser,
    terminator: &Parser,
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let mut current = previous.clone();
    let mut first_offset = None;
    let mut last_good: Option<ParserMatch> = None;
    let mut count = 0usize;

    loop {
        let a = item.try_match(scanner, current.clone(), true);
        if a.is_failure() {
            break;
        }
        let b = terminator.try_match(scanner, Some(a.clone()), true);
        if b.is_failure() {
            // A trailing item with no terminator is dropped entirely: the
            // cursor rewinds to before that item, i.e. stays at the last
            // successfully terminated pair.
            break;
        }
        first_offset.get_or_insert_with(|| a.offset());
        last_good = Some(b.clone());
        current = Some(b);
        count += 1;
    }

    if count < 1 {
        return scanner.no_match(self_parser, previous.as_ref());
    }
    let last = last_good.expect("count >= 1");
    let offset = first_offset.expect("set alongside count >= 1");
    scanner.create_match(self_parser, offset, span(offset, last.right()), Some(last))
}

pub(super) fn match_recursion(
    self_parser: &Parser,
    slot: &ForwardSlot,
    scanner: &Scanner,
    previous: Option<ParserMatch>,
) -> ParserMatch {
    let Some(target) = slot.target() else {
        return scanner.no_match(self_parser, previous.as_ref());
    };
    let holder_id = self_parser.id();
    let at = previous.as_ref().map(|p| p.right()).unwrap_or(0);
    let incoming_source = previous
        .as_ref()
        .and_then(|p| p.source_parser())
        .map(|p| p.id());

    let already_in_flight = scanner.with_context(holder_id, |ctx| {
        if ctx.in_flight.iter().any(|(o, s)| *o == at && *s == incoming_source) {
            true
        } else {
            ctx.in_flight.push((at, incoming_source));
            false
        }
    });
    if already_in_flight {
        trace!("left-recursion guard: rejecting re-entry at offset {at}");
        return scanner.null_match(self_parser, previous.as_ref());
    }

    let result = target.try_match(scanner, previous.clone(), true);

    scanner.with_context(holder_id, |ctx| {
        ctx.in_flight.retain(|(o, s)| !(*o == at && *s == incoming_source));
    });

    let no_progress = match previous.as_ref() {
        Some(prev) => result.is_success() && result.same_span(prev),
        None => result.is_success() && result.offset() == 0 && result.right() == 0,
    };
    if no_progress {
        // No forward progress across the whole recursive call: treat as a
        // failure rather than let a caller (e.g. a `repeat`) spin forever.
        trace!("left-recursion guard: no-progress stop at offset {at}");
        return scanner.null_match(self_parser, previous.as_ref());
    }
    result
}

fn span(offset: u32, right: u32) -> i32 {
    (right - offset) as i32
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::{char_range, literal_char};
    use crate::scanner::ParseOptions;

    #[test]
    fn could_recurse_immediately_true_through_an_ordered_choice_first_alternative() {
        let holder = forward();
        let digit = char_range('0', '9');
        let grammar = choice(vec![
            sequence(vec![holder.clone(), literal_char('+'), digit.clone()]).unwrap(),
            digit,
        ])
        .unwrap();
        assert!(could_recurse_immediately(
            &grammar,
            holder.id(),
            64,
            &mut HashSet::new()
        ));
    }

    #[test]
    fn could_recurse_immediately_false_when_recursion_is_not_the_first_step() {
        let holder = forward();
        let digit = char_range('0', '9');
        let grammar = choice(vec![
            sequence(vec![digit.clone(), literal_char('+'), holder.clone()]).unwrap(),
            digit,
        ])
        .unwrap();
        assert!(!could_recurse_immediately(
            &grammar,
            holder.id(),
            64,
            &mut HashSet::new()
        ));
    }

    #[test]
    fn assign_rejects_a_directly_left_recursive_grammar() {
        let e = forward();
        let digit = char_range('0', '9');
        let body = choice(vec![
            sequence(vec![e.clone(), literal_char('+'), digit.clone()]).unwrap(),
            digit,
        ])
        .unwrap();
        assert_eq!(e.assign(body), Err(GrammarError::UnboundedLeftRecursion));
    }

    #[test]
    fn assign_accepts_the_equivalent_right_recursive_rewrite() {
        let e = forward();
        let digit = char_range('0', '9');
        let body = choice(vec![
            sequence(vec![digit.clone(), literal_char('+'), e.clone()]).unwrap(),
            digit,
        ])
        .unwrap();
        assert!(e.assign(body).is_ok());

        let scanner = Scanner::new("1+2+3", ParseOptions::default());
        let m = e.try_match(&scanner, None, false);
        assert!(m.is_success());
        assert_eq!(m.value(), "1+2+3");
    }
}
