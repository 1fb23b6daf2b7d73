use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Drops tokens longer than `max_bytes`. Oversized tokens are almost
/// always noise (base64 blobs, minified fragments) and bloat the
/// dictionary.
#[derive(Debug, Clone)]
pub struct MaxLengthFilter {
    pub max_bytes: usize,
}

impl MaxLengthFilter {
    pub fn new(max_bytes: usize) -> Self {
        MaxLengthFilter { max_bytes }
    }
}

impl Default for MaxLengthFilter {
    fn default() -> Self {
        MaxLengthFilter { max_bytes: 255 }
    }
}

impl TokenFilter for MaxLengthFilter {
    fn apply(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter(|token| token.text.len() <= self.max_bytes)
            .collect()
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(self.clone())
    }
}
