//! A PEG-style parser combinator library.
//!
//! An author composes small atomic recognizers ([`literal_char`],
//! [`regex`], [`char_range`], ...) into larger grammars with sequencing,
//! ordered choice, repetition, and the other combinators in [`parser`],
//! applies the resulting [`Parser`] to an input string via
//! [`Parser::parse_string`], and then reads the resulting [`ParserMatch`]
//! either as a flat [`tagged_tokens`] stream, a [`scope_tree`] hierarchy, or
//! a parser-structural [`tree`].
//!
//! ```
//! use pegmatite::{char_range, repeat, seq, ParseOptions};
//!
//! let digit = char_range('0', '9');
//! let number = seq(digit.clone(), repeat(digit, 0, None).unwrap());
//! let m = number.parse_string("1234", ParseOptions::default());
//! assert!(m.is_success());
//! assert_eq!(m.value(), "1234");
//! ```

mod error;
mod match_;
mod parser;
mod result;
mod scanner;

pub use error::{GrammarError, ScannerError};
pub use match_::ParserMatch;
pub use parser::{
    and, any_char, char_in_set, char_range, choice, delimited, diff, empty, end_of_input, forward,
    literal_char, literal_string, literal_string_ci, one_or_more, opt, or, regex, remaining,
    repeat, seq, sequence, terminated, xor, zero_or_more, Parser, ParserId, ScopeKind,
};
pub use result::{scope_tree, tagged_tokens, tree, ScopeNode, ScopeNodeKind, Token, TreeNode};
pub use scanner::{CaseSensitivity, CaseTransform, ParseOptions, Scanner};
