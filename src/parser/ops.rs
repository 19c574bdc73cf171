//! Operator sugar over the combinator constructors in
//! [`composites`](super::composites). Purely ergonomic: every operator here
//! has an equivalent named function, and grammars are free to use either.

use std::ops::{Add, BitAnd, BitOr, BitXor, Rem, Shr, Sub};

use super::{and, diff, or, seq, terminated, xor, Parser};
use crate::parser::delimited;

/// `a + b` is `seq(a, b)`.
impl Add for Parser {
    type Output = Parser;
    fn add(self, rhs: Parser) -> Parser {
        seq(self, rhs)
    }
}

/// `a | b` is `or(a, b)`.
impl BitOr for Parser {
    type Output = Parser;
    fn bitor(self, rhs: Parser) -> Parser {
        or(self, rhs)
    }
}

/// `a ^ b` is `xor(a, b)`.
impl BitXor for Parser {
    type Output = Parser;
    fn bitxor(self, rhs: Parser) -> Parser {
        xor(self, rhs)
    }
}

/// `a & b` is `and(a, b)`.
impl BitAnd for Parser {
    type Output = Parser;
    fn bitand(self, rhs: Parser) -> Parser {
        and(self, rhs)
    }
}

/// `a - b` is `diff(a, b)`.
impl Sub for Parser {
    type Output = Parser;
    fn sub(self, rhs: Parser) -> Parser {
        diff(self, rhs)
    }
}

/// `a % b` is `delimited(a, b)`.
impl Rem for Parser {
    type Output = Parser;
    fn rem(self, rhs: Parser) -> Parser {
        delimited(self, rhs)
    }
}

/// `a >> b` is `terminated(a, b)`. Rust has no infix operator matching the
/// `a < b` notation used elsewhere for this combinator, so `>>` is borrowed
/// for it; the named [`terminated`] function is the primary spelling.
impl Shr for Parser {
    type Output = Parser;
    fn shr(self, rhs: Parser) -> Parser {
        terminated(self, rhs)
    }
}
