use crate::analysis::token::Token;

/// Transforms a token stream. Filters may drop or rewrite tokens but
/// must keep positions non-decreasing and offsets untouched.
pub trait TokenFilter: Send + Sync {
    fn apply(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn clone_box(&self) -> Box<dyn TokenFilter>;
}

impl Clone for Box<dyn TokenFilter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
