use std::collections::HashSet;
use std::sync::Arc;

use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Drops tokens found in a stop set. Positions of surviving tokens are
/// untouched, so phrase gaps remain visible.
#[derive(Clone)]
pub struct StopWordFilter {
    words: Arc<HashSet<String>>,
}

impl StopWordFilter {
    pub fn new(words: impl IntoIterator<Item = String>) -> Self {
        StopWordFilter {
            words: Arc::new(words.into_iter().collect()),
        }
    }

    pub fn from_list(words: &[&str]) -> Self {
        Self::new(words.iter().map(|w| w.to_string()))
    }
}

impl TokenFilter for StopWordFilter {
    fn apply(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter(|token| !self.words.contains(&token.text))
            .collect()
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_words_removed_positions_kept() {
        let filter = StopWordFilter::from_list(&["the", "a"]);
        let tokens = vec![
            Token::new("the", 0, 3, 0),
            Token::new("quick", 4, 9, 1),
            Token::new("a", 10, 11, 2),
            Token::new("fox", 12, 15, 3),
        ];
        let filtered = filter.apply(tokens);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].text, "quick");
        assert_eq!(filtered[1].position, 3);
    }
}
