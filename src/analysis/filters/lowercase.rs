use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

#[derive(Debug, Clone, Default)]
pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn apply(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in &mut tokens {
            if token.text.chars().any(|c| c.is_uppercase()) {
                token.text = token.text.to_lowercase();
            }
        }
        tokens
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(self.clone())
    }
}
