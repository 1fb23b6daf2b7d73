use serde::{Deserialize, Serialize};

/// One token emitted by a tokenizer.
///
/// `byte_start`/`byte_end` address the original input string, never a
/// normalized form; `position` is non-decreasing along the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub byte_start: usize,
    pub byte_end: usize,
    pub position: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, byte_start: usize, byte_end: usize, position: u32) -> Self {
        Token {
            text: text.into(),
            byte_start,
            byte_end,
            position,
        }
    }
}

/// Caller-tokenized text. Feeds the indexer directly, skipping the
/// field's analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreTokenizedString {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl PreTokenizedString {
    pub fn new(text: impl Into<String>, tokens: Vec<Token>) -> Self {
        PreTokenizedString {
            text: text.into(),
            tokens,
        }
    }
}
