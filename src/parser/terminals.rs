//! The atomic recognizers: literals, character classes, regex fragments,
//! and the handful of always-true/always-position-dependent parsers.

use crate::error::GrammarError;
use crate::match_::ParserMatch;
use crate::scanner::Scanner;

use super::{Parser, ParserKind};

/// Matches a single, specific character.
pub fn literal_char(c: char) -> Parser {
    Parser::new(ParserKind::LiteralChar(c))
}

/// Matches `text` exactly, case-sensitively.
pub fn literal_string(text: impl Into<String>) -> Parser {
    Parser::new(ParserKind::LiteralString {
        text: text.into(),
        case_sensitive: true,
    })
}

/// Matches `text`, ignoring case.
pub fn literal_string_ci(text: impl Into<String>) -> Parser {
    Parser::new(ParserKind::LiteralString {
        text: text.into(),
        case_sensitive: false,
    })
}

/// Matches any single character that is not at the end of input.
pub fn any_char() -> Parser {
    Parser::new(ParserKind::AnyCharacter)
}

/// Matches only at the end of input, consuming nothing.
pub fn end_of_input() -> Parser {
    Parser::new(ParserKind::EndOfInput)
}

/// Always matches, consuming nothing. Useful as a `Repetition`/`Union`
/// identity, or as a placeholder for an unused forward reference branch.
pub fn empty() -> Parser {
    Parser::new(ParserKind::EmptyMatch)
}

/// Matches a single character in `[lo, hi]` (inclusive).
pub fn char_range(lo: char, hi: char) -> Parser {
    char_in_set(vec![(lo, hi)], Vec::new())
}

/// Matches a single character falling in any of `ranges`, and not in
/// `exclusions`.
pub fn char_in_set(ranges: Vec<(char, char)>, exclusions: Vec<char>) -> Parser {
    Parser::new(ParserKind::CharacterInRanges { ranges, exclusions })
}

/// Matches a regular expression fragment, anchored at the cursor: a `^`
/// inside `pattern` refers to the current scanning position, not the start
/// of the whole input.
pub fn regex(pattern: &str) -> Result<Parser, GrammarError> {
    let re =
        regex::Regex::new(pattern).map_err(|e| GrammarError::RegexCompile(e.to_string()))?;
    Ok(Parser::new(ParserKind::RegularExpression(re)))
}

/// Matches iff the number of remaining characters to end-of-input falls in
/// `[min, max]` (an unbounded `max` of `None` means "at least `min`"),
/// consuming the rest of the input.
pub fn remaining(min: usize, max: Option<usize>) -> Parser {
    Parser::new(ParserKind::RemainingLength { min, max })
}

pub(super) fn try_match_terminal(
    parser: &Parser,
    kind: &ParserKind,
    scanner: &Scanner,
    previous: Option<&ParserMatch>,
) -> ParserMatch {
    let offset = previous.map(|p| p.right()).unwrap_or(0);
    match kind {
        ParserKind::LiteralChar(c) => {
            if scanner.peek(offset) == *c {
                scanner.create_match(parser, offset, c.len_utf8() as i32, previous.cloned())
            } else {
                scanner.no_match(parser, previous)
            }
        }
        ParserKind::LiteralString { text, case_sensitive } => {
            let view = if *case_sensitive {
                scanner.try_untransformed_substring(offset, text.len() as i32)
            } else {
                scanner.try_substring(offset, text.len() as i32)
            };
            let matches = match view {
                // A candidate length landing inside a multi-byte character
                // can never be this literal: reject rather than slice.
                None => false,
                Some(view) if *case_sensitive => view == text,
                Some(view) => view.eq_ignore_ascii_case(text),
            };
            if matches {
                scanner.create_match(parser, offset, text.len() as i32, previous.cloned())
            } else {
                scanner.no_match(parser, previous)
            }
        }
        ParserKind::CharacterInRanges { ranges, exclusions } => {
            if scanner.end_of_input(offset) {
                return scanner.no_match(parser, previous);
            }
            let c = scanner.peek(offset);
            let in_range = ranges.iter().any(|(lo, hi)| *lo <= c && c <= *hi);
            let excluded = exclusions.contains(&c);
            if in_range && !excluded {
                scanner.create_match(parser, offset, c.len_utf8() as i32, previous.cloned())
            } else {
                scanner.no_match(parser, previous)
            }
        }
        ParserKind::AnyCharacter => {
            if scanner.end_of_input(offset) {
                scanner.no_match(parser, previous)
            } else {
                let c = scanner.peek(offset);
                scanner.create_match(parser, offset, c.len_utf8() as i32, previous.cloned())
            }
        }
        ParserKind::EndOfInput => {
            if scanner.end_of_input(offset) {
                scanner.empty_match(parser, offset, previous.cloned())
            } else {
                scanner.no_match(parser, previous)
            }
        }
        ParserKind::EmptyMatch => scanner.empty_match(parser, offset, previous.cloned()),
        ParserKind::RegularExpression(re) => {
            let rest = scanner.substring(offset, scanner.len() as i32 - offset as i32);
            match re.find(rest) {
                Some(found) if found.start() == 0 => scanner.create_match(
                    parser,
                    offset,
                    found.len() as i32,
                    previous.cloned(),
                ),
                _ => scanner.no_match(parser, previous),
            }
        }
        ParserKind::RemainingLength { min, max } => {
            let remaining = scanner.len().saturating_sub(offset as usize);
            let within_max = max.map(|m| remaining <= m).unwrap_or(true);
            if remaining >= *min && within_max {
                scanner.create_match(parser, offset, remaining as i32, previous.cloned())
            } else {
                scanner.no_match(parser, previous)
            }
        }
        _ => unreachable!("try_match_terminal called with a composite kind"),
    }
}
