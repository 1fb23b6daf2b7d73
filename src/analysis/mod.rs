pub mod filter;
pub mod filters;
pub mod language;
pub mod registry;
pub mod stopwords;
pub mod token;
pub mod tokenizer;

pub use filter::TokenFilter;
pub use language::Language;
pub use registry::{AnalyzerSpec, BaseTokenizer, TextAnalyzer, TokenizerRegistry};
pub use token::{PreTokenizedString, Token};
pub use tokenizer::Tokenizer;
