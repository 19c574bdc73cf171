//! The flattest of the three result views: a tagged token stream.

use crate::match_::ParserMatch;

/// A single tagged, non-empty span from a match chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tag: String,
    pub value: String,
    pub offset: u32,
    pub length: u32,
}

/// Walks `m`'s chain in parse order, keeping only matches that carry a tag
/// and consumed at least one character.
pub fn tagged_tokens(m: &ParserMatch) -> Vec<Token> {
    m.chain()
        .into_iter()
        .filter(|step| !step.is_empty())
        .filter_map(|step| {
            let tag = step.tag()?;
            Some(Token {
                tag,
                value: step.value(),
                offset: step.offset(),
                length: step.right() - step.offset(),
            })
        })
        .collect()
}
