//! Error types raised outside the normal parse-failure value.
//!
//! A failed match is never an exception: it is represented as a
//! [`ParserMatch`](crate::ParserMatch) with a negative length. The errors in
//! this module are reserved for problems that make a grammar or a scanner
//! unusable in the first place, and are always raised eagerly, at
//! construction time rather than buried in the middle of a parse.

use thiserror::Error;

/// Raised while *building* a grammar, before any input is ever scanned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A [`forward()`](crate::forward) reference was never assigned a target
    /// parser before the grammar was used.
    #[error("forward reference was never assigned a parser")]
    UnassignedForwardReference,

    /// A `forward()` holder resolves back to itself with no alternative that
    /// could consume input first, e.g. `e.assign(seq(e.clone(), ...))`. Such a
    /// grammar would recurse at the same offset forever.
    #[error("parser is left-recursive with no non-recursive alternative")]
    UnboundedLeftRecursion,

    /// A composite combinator was built with a null/empty child list where at
    /// least one child is required (e.g. an empty `Sequence` or `Union`).
    #[error("{combinator} requires at least one child parser")]
    MissingChild { combinator: &'static str },

    /// `repeat(p, min, max)` was built with `max < min`.
    #[error("invalid repetition bounds: min={min} > max={max}")]
    InvalidRepetitionBounds { min: usize, max: usize },

    /// The pattern passed to [`regex()`](crate::regex) failed to compile.
    #[error("regex fragment failed to compile: {0}")]
    RegexCompile(String),
}

/// Raised when a [`Scanner`](crate::Scanner) is used incorrectly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScannerError {
    /// `Scanner::complete` was already called; the scanner may not be read
    /// from again.
    #[error("scanner was read from after completion")]
    ReadAfterComplete,

    /// A case-insensitive transform was requested but the scanner's
    /// transformed view was built with a different transform.
    #[error("scanner constructed with mismatched case transform")]
    MismatchedTransform,
}
