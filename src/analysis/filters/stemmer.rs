use rust_stemmers::{Algorithm, Stemmer};

use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Snowball stemmer over lowercased tokens.
pub struct StemmerFilter {
    algorithm: Algorithm,
    stemmer: Stemmer,
}

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter {
            algorithm,
            stemmer: Stemmer::create(algorithm),
        }
    }
}

impl TokenFilter for StemmerFilter {
    fn apply(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in &mut tokens {
            let stemmed = self.stemmer.stem(&token.text);
            if stemmed != token.text {
                token.text = stemmed.into_owned();
            }
        }
        tokens
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(StemmerFilter::new(self.algorithm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_stemming() {
        let filter = StemmerFilter::new(Algorithm::English);
        let tokens = vec![
            Token::new("running", 0, 7, 0),
            Token::new("foxes", 8, 13, 1),
        ];
        let stemmed = filter.apply(tokens);
        assert_eq!(stemmed[0].text, "run");
        assert_eq!(stemmed[1].text, "fox");
        // Offsets still address the original text.
        assert_eq!(stemmed[0].byte_end, 7);
    }
}
