use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::Token;

/// A tokenizer is a pure function from text to an ordered token stream.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

impl Clone for Box<dyn Tokenizer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Splits on Unicode word boundaries, dropping punctuation-only chunks.
/// Case is preserved; lowercasing is a filter concern.
#[derive(Debug, Clone, Default)]
pub struct StandardTokenizer;

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;
        for (byte_start, word) in text.unicode_word_indices() {
            tokens.push(Token::new(word, byte_start, byte_start + word.len(), position));
            position += 1;
        }
        tokens
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

/// Splits on whitespace only; punctuation stays attached to tokens.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;
        let mut start: Option<usize> = None;
        for (offset, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if let Some(byte_start) = start.take() {
                    tokens.push(Token::new(&text[byte_start..offset], byte_start, offset, position));
                    position += 1;
                }
            } else if start.is_none() {
                start = Some(offset);
            }
        }
        if let Some(byte_start) = start {
            tokens.push(Token::new(&text[byte_start..], byte_start, text.len(), position));
        }
        tokens
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

/// Emits the whole input as a single token.
#[derive(Debug, Clone, Default)]
pub struct KeywordTokenizer;

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }
        vec![Token::new(text, 0, text.len(), 0)]
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

/// Tokens are the non-overlapping matches of a regular expression.
#[derive(Debug, Clone)]
pub struct RegexTokenizer {
    pattern: Regex,
}

impl RegexTokenizer {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(RegexTokenizer {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        self.pattern
            .find_iter(text)
            .enumerate()
            .map(|(position, m)| Token::new(m.as_str(), m.start(), m.end(), position as u32))
            .collect()
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

/// Character n-grams between `min` and `max` graphemes. With
/// `edge_only`, only grams anchored at the start of the input.
#[derive(Debug, Clone)]
pub struct NgramTokenizer {
    pub min: usize,
    pub max: usize,
    pub edge_only: bool,
}

impl NgramTokenizer {
    pub fn new(min: usize, max: usize, edge_only: bool) -> Self {
        NgramTokenizer {
            min: min.max(1),
            max: max.max(min.max(1)),
            edge_only,
        }
    }
}

impl Tokenizer for NgramTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        // Grapheme offsets, plus the end sentinel.
        let mut offsets: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
        offsets.push(text.len());
        let graphemes = offsets.len() - 1;

        let mut tokens = Vec::new();
        let mut position = 0u32;
        let starts = if self.edge_only { 1 } else { graphemes };
        for start in 0..starts {
            for len in self.min..=self.max {
                if start + len > graphemes {
                    break;
                }
                let byte_start = offsets[start];
                let byte_end = offsets[start + len];
                tokens.push(Token::new(&text[byte_start..byte_end], byte_start, byte_end, position));
            }
            // All grams sharing a start share a position.
            position += 1;
        }
        tokens
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}
