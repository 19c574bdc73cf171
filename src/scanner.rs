//! The [`Scanner`]: owns the input buffer for one parse, answers positional
//! queries, and accumulates the diagnostics a failed parse reports.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use log::trace;

use crate::error::ScannerError;
use crate::match_::ParserMatch;
use crate::parser::{Parser, ParserId};

/// How the scanner's "transformed" view relates to the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseTransform {
    /// The transformed view is identical to the original input.
    #[default]
    None,
    /// The transformed view is the ASCII-lowercased input. Only ASCII bytes
    /// are folded, so byte offsets stay valid in both views.
    Lower,
}

/// Case sensitivity for [`Scanner::index_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

/// Options for [`Parser::parse_string`](crate::Parser::parse_string).
#[derive(Clone, Default)]
pub struct ParseOptions {
    /// A sub-parser run between combinator children, e.g. whitespace.
    pub auto_advance: Option<Parser>,
    /// How the scanner's transformed view relates to the input.
    pub case_transform: CaseTransform,
    /// Whether post-processors should retain auto-advance matches that
    /// carry no tag of their own.
    pub include_skipped: bool,
}

#[derive(Clone)]
struct FailurePoint {
    parser: Parser,
    offset: u32,
    length: i32,
}

/// Per-parser, per-parse memo used by the recursion combinator to guard
/// against left recursion: the set of `(offset, incoming source parser id)`
/// pairs already being attempted for a given holder.
#[derive(Default)]
pub(crate) struct RecursionContext {
    pub(crate) in_flight: Vec<(u32, Option<ParserId>)>,
}

pub(crate) struct ScannerData {
    input: String,
    transformed: String,
    auto_advance: Option<Parser>,
    include_skipped: bool,
    furthest_match: RefCell<Option<ParserMatch>>,
    furthest_test: RefCell<Option<ParserMatch>>,
    failure_points: RefCell<Vec<FailurePoint>>,
    failed_tags: RefCell<Vec<String>>,
    furthest_tag: RefCell<Option<String>>,
    last_tag: RefCell<Option<String>>,
    contexts: RefCell<HashMap<ParserId, RecursionContext>>,
    completed: RefCell<bool>,
}

/// Owns the input buffer for a single parse.
///
/// A `Scanner` is cheap to clone (an `Rc` bump) and every clone refers to
/// the same underlying state; this lets combinators and matches each hold
/// their own handle without threading a `&mut Scanner` through the whole
/// recursive descent. [`Scanner::complete`] marks it exhausted so that a
/// fresh scanner is required for a second parse.
#[derive(Clone)]
pub struct Scanner(pub(crate) Rc<ScannerData>);

impl Scanner {
    pub fn new(input: &str, opts: ParseOptions) -> Scanner {
        let transformed = match opts.case_transform {
            CaseTransform::None => input.to_string(),
            CaseTransform::Lower => input.to_ascii_lowercase(),
        };
        debug_assert_eq!(
            input.len(),
            transformed.len(),
            "transformed view must stay code-unit aligned with the input"
        );
        Scanner(Rc::new(ScannerData {
            input: input.to_string(),
            transformed,
            auto_advance: opts.auto_advance,
            include_skipped: opts.include_skipped,
            furthest_match: RefCell::new(None),
            furthest_test: RefCell::new(None),
            failure_points: RefCell::new(Vec::new()),
            failed_tags: RefCell::new(Vec::new()),
            furthest_tag: RefCell::new(None),
            last_tag: RefCell::new(None),
            contexts: RefCell::new(HashMap::new()),
            completed: RefCell::new(false),
        }))
    }

    pub(crate) fn from_rc(data: Rc<ScannerData>) -> Scanner {
        Scanner(data)
    }

    pub(crate) fn downgrade(&self) -> Weak<ScannerData> {
        Rc::downgrade(&self.0)
    }

    /// Whether post-processors should retain untagged auto-advance matches.
    pub fn include_skipped(&self) -> bool {
        self.0.include_skipped
    }

    /// The length, in bytes, of the input.
    pub fn len(&self) -> usize {
        self.0.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.input.is_empty()
    }

    pub fn end_of_input(&self, offset: u32) -> bool {
        offset as usize >= self.0.input.len()
    }

    /// The character at `offset` in the transformed view, or `'\0'` past the
    /// end of input.
    pub fn peek(&self, offset: u32) -> char {
        self.0.transformed[offset as usize..]
            .chars()
            .next()
            .unwrap_or('\0')
    }

    /// A view of the transformed input spanning `[offset, offset+length)`,
    /// or, if `length` is negative, the `|length|` units ending at `offset`.
    /// Truncated at the bounds of the input.
    pub fn substring(&self, offset: u32, length: i32) -> &str {
        clamp_substring(&self.0.transformed, offset, length)
            .expect("substring bounds must fall on char boundaries")
    }

    /// As [`Scanner::substring`], but over the original, untransformed
    /// input.
    pub fn untransformed_substring(&self, offset: u32, length: i32) -> &str {
        clamp_substring(&self.0.input, offset, length)
            .expect("substring bounds must fall on char boundaries")
    }

    /// As [`Scanner::substring`], but `None` instead of panicking if the
    /// requested span doesn't land on a char boundary. Used where `length`
    /// is a candidate byte length (e.g. a literal pattern's) rather than
    /// one already known to align with the input's characters.
    pub(crate) fn try_substring(&self, offset: u32, length: i32) -> Option<&str> {
        clamp_substring(&self.0.transformed, offset, length)
    }

    /// As [`Scanner::try_substring`], but over the original, untransformed
    /// input.
    pub(crate) fn try_untransformed_substring(&self, offset: u32, length: i32) -> Option<&str> {
        clamp_substring(&self.0.input, offset, length)
    }

    /// The first occurrence of `needle` on or after `offset`, or `None`.
    pub fn index_of(&self, offset: u32, needle: &str, comparison: CaseSensitivity) -> Option<u32> {
        if needle.is_empty() {
            return Some(offset);
        }
        let start = (offset as usize).min(self.0.transformed.len());
        let haystack = &self.0.transformed[start..];
        let found = match comparison {
            CaseSensitivity::Sensitive => haystack.find(needle),
            CaseSensitivity::Insensitive => {
                let needle_lower = needle.to_ascii_lowercase();
                haystack.to_ascii_lowercase().find(&needle_lower)
            }
        };
        found.map(|i| offset + i as u32)
    }

    /// Run the auto-advance sub-parser (if any) at `previous`'s right edge,
    /// with `allow_auto_advance = false` so it can't recurse into itself.
    /// Returns either its (possibly zero-length) success, or an unrecorded
    /// null match at the same position if there is no auto-advance parser
    /// or it failed to match.
    pub(crate) fn do_auto_advance(&self, previous: Option<&ParserMatch>) -> ParserMatch {
        let right = previous.map(|p| p.right()).unwrap_or(0);
        match &self.0.auto_advance {
            None => self.null_match_at(previous, right),
            Some(advancer) => {
                let attempt = advancer.try_match(self, previous.cloned(), false);
                if attempt.is_success() {
                    trace!("auto-advance consumed [{}, {})", attempt.offset(), attempt.right());
                    attempt
                } else {
                    self.null_match_at(previous, right)
                }
            }
        }
    }

    fn null_match_at(&self, previous: Option<&ParserMatch>, offset: u32) -> ParserMatch {
        ParserMatch::new(
            &self.sentinel_parser(),
            self,
            offset,
            -1,
            previous.cloned(),
        )
    }

    /// A placeholder parser used only to source sentinel (no-op) matches,
    /// e.g. the synthetic cursor handed to the very first combinator in a
    /// parse, or a skipped auto-advance step. Never appears in a real
    /// grammar and so never carries a tag.
    fn sentinel_parser(&self) -> Parser {
        thread_local! {
            static SENTINEL: Parser = crate::parser::empty();
        }
        SENTINEL.with(|p| p.clone())
    }

    /// A failed attempt at `previous`'s position (or `0`), recording the
    /// deepest failure seen so far for diagnostics.
    pub(crate) fn no_match(&self, parser: &Parser, previous: Option<&ParserMatch>) -> ParserMatch {
        let offset = previous.map(|p| p.offset()).unwrap_or(0);
        let m = ParserMatch::new(parser, self, offset, -1, previous.cloned());
        self.record_test(&m);
        self.add_failure(parser.clone(), &m);
        m
    }

    /// Like [`Scanner::no_match`], but does not record a diagnostic
    /// failure. Used internally by combinators that need a placeholder
    /// failure (e.g. the recursion no-progress guard) without polluting
    /// the "expected ..." report with a phantom alternative.
    pub(crate) fn null_match(&self, parser: &Parser, previous: Option<&ParserMatch>) -> ParserMatch {
        let offset = previous.map(|p| p.offset()).unwrap_or(0);
        ParserMatch::new(parser, self, offset, -1, previous.cloned())
    }

    /// A zero-length success at `offset`.
    pub(crate) fn empty_match(
        &self,
        parser: &Parser,
        offset: u32,
        previous: Option<ParserMatch>,
    ) -> ParserMatch {
        self.create_match(parser, offset, 0, previous)
    }

    /// A success covering `[offset, offset+length)`.
    pub(crate) fn create_match(
        &self,
        parser: &Parser,
        offset: u32,
        length: i32,
        previous: Option<ParserMatch>,
    ) -> ParserMatch {
        debug_assert!(length >= 0);
        let m = ParserMatch::new(parser, self, offset, length, previous);
        self.record_match(&m);
        m
    }

    fn record_match(&self, m: &ParserMatch) {
        let beats = match self.0.furthest_match.borrow().as_ref() {
            Some(cur) => m.right() > cur.right(),
            None => true,
        };
        if beats {
            *self.0.furthest_match.borrow_mut() = Some(m.clone());
            if let Some(tag) = m.tag() {
                *self.0.last_tag.borrow_mut() = Some(tag);
            }
        }
    }

    fn record_test(&self, m: &ParserMatch) {
        let beats = match self.0.furthest_test.borrow().as_ref() {
            Some(cur) => m.right() >= cur.right(),
            None => true,
        };
        if beats {
            *self.0.furthest_test.borrow_mut() = Some(m.clone());
        }
    }

    /// Record a failed attempt for diagnostics.
    pub(crate) fn add_failure(&self, parser: Parser, m: &ParserMatch) {
        let furthest = self.0.furthest_test.borrow().as_ref().map(|f| f.right());
        if Some(m.right()) == furthest || furthest.is_none() {
            if let Some(tag) = parser.tag_name() {
                let mut tags = self.0.failed_tags.borrow_mut();
                if !tags.iter().any(|t| t == tag) {
                    tags.push(tag.to_string());
                }
                *self.0.furthest_tag.borrow_mut() = Some(tag.to_string());
            }
        }
        self.0.failure_points.borrow_mut().push(FailurePoint {
            parser,
            offset: m.offset(),
            length: m.raw_length(),
        });
    }

    /// Reset accumulated failure diagnostics (but not `furthest_match`).
    /// Ordered-choice combinators call this when a left alternative
    /// succeeds, so stale failures from elsewhere don't leak into an
    /// unrelated future report.
    pub fn clear_failures(&self) {
        self.0.failure_points.borrow_mut().clear();
        self.0.failed_tags.borrow_mut().clear();
        *self.0.furthest_tag.borrow_mut() = None;
    }

    /// Render the "Expected ... After ..." diagnostic for failures at or
    /// beyond `min_offset`. Returns `None` if there is nothing to report.
    pub fn list_failures(&self, min_offset: u32, show_details: bool) -> Option<String> {
        let points = self.0.failure_points.borrow();
        let relevant: Vec<&FailurePoint> =
            points.iter().filter(|f| f.offset >= min_offset).collect();
        if relevant.is_empty() {
            return None;
        }
        let furthest_offset = relevant.iter().map(|f| f.offset).max().unwrap_or(min_offset);

        let mut expected: Vec<String> = Vec::new();
        for f in relevant.iter().filter(|f| f.offset == furthest_offset) {
            let label = f
                .parser
                .tag_name()
                .map(str::to_string)
                .unwrap_or_else(|| f.parser.short_description(3));
            if !expected.contains(&label) {
                expected.push(label);
            }
        }

        let mut out = String::new();
        write!(out, "Expected ").ok();
        for (i, e) in expected.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write!(out, "'{e}'").ok();
        }
        if let Some(prior) = self.prior_tag_before(furthest_offset) {
            write!(out, " After '{prior}'").ok();
        }
        if show_details {
            let before = self.untransformed_substring(0, furthest_offset as i32);
            let bad_end = (furthest_offset as usize + 1).min(self.0.input.len());
            let bad = &self.0.input[furthest_offset as usize..bad_end];
            let rest_start = bad_end as u32;
            let rest = self.untransformed_substring(rest_start, (self.0.input.len() - bad_end) as i32);
            write!(out, " {before}\u{25e2}{bad}\u{25e3}{rest}").ok();
        }
        Some(out)
    }

    fn prior_tag_before(&self, offset: u32) -> Option<String> {
        let furthest_match = self.0.furthest_match.borrow();
        match furthest_match.as_ref() {
            Some(m) if m.right() <= offset => m.tag().or_else(|| self.0.last_tag.borrow().clone()),
            _ => self.0.last_tag.borrow().clone(),
        }
    }

    /// The deepest position any parser has succeeded at.
    pub fn furthest_match(&self) -> Option<ParserMatch> {
        self.0.furthest_match.borrow().clone()
    }

    /// The deepest position any parser has attempted (successfully or not).
    pub fn furthest_test(&self) -> Option<ParserMatch> {
        self.0.furthest_test.borrow().clone()
    }

    pub(crate) fn with_context<R>(
        &self,
        parser: ParserId,
        f: impl FnOnce(&mut RecursionContext) -> R,
    ) -> R {
        let mut contexts = self.0.contexts.borrow_mut();
        let ctx = contexts.entry(parser).or_default();
        f(ctx)
    }

    /// Marks the scanner unusable for a new top-level parse. Calling
    /// [`Parser::parse_string`](crate::Parser::parse_string) or
    /// [`Parser::parse`](crate::Parser::parse) again afterwards fails with
    /// [`ScannerError::ReadAfterComplete`]; reading already-produced matches
    /// (`.value()`, `tagged_tokens()`, `scope_tree()`, ...) remains valid.
    pub fn complete(&self) {
        *self.0.completed.borrow_mut() = true;
    }

    pub fn is_completed(&self) -> bool {
        *self.0.completed.borrow()
    }

    pub(crate) fn ensure_not_completed(&self) -> Result<(), ScannerError> {
        if self.is_completed() {
            Err(ScannerError::ReadAfterComplete)
        } else {
            Ok(())
        }
    }
}

fn clamp_substring(s: &str, offset: u32, length: i32) -> Option<&str> {
    let len = s.len();
    if length >= 0 {
        let start = (offset as usize).min(len);
        let end = start.saturating_add(length as usize).min(len);
        s.get(start..end)
    } else {
        let end = (offset as usize).min(len);
        let span = (-length) as usize;
        let start = end.saturating_sub(span);
        s.get(start..end)
    }
}
