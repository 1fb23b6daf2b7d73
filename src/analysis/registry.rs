use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::{LowercaseFilter, MaxLengthFilter, StemmerFilter, StopWordFilter};
use crate::analysis::language::{Language, ALL_LANGUAGES};
use crate::analysis::stopwords::stop_words;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{
    KeywordTokenizer, NgramTokenizer, RegexTokenizer, StandardTokenizer, Tokenizer,
    WhitespaceTokenizer,
};
use crate::core::error::{Error, ErrorKind, Result};

/// A tokenizer composed with a filter chain. For a fixed configuration,
/// analysis is pure: the same input always yields the same stream.
#[derive(Clone)]
pub struct TextAnalyzer {
    tokenizer: Box<dyn Tokenizer>,
    filters: Vec<Box<dyn TokenFilter>>,
}

impl TextAnalyzer {
    pub fn new(tokenizer: impl Tokenizer + 'static) -> Self {
        TextAnalyzer {
            tokenizer: Box::new(tokenizer),
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: impl TokenFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);
        for filter in &self.filters {
            tokens = filter.apply(tokens);
        }
        tokens
    }
}

/// Options for [`TokenizerRegistry::register_analyzer`].
#[derive(Debug, Clone, Default)]
pub struct AnalyzerSpec {
    pub lowercase: bool,
    pub stop_language: Option<Language>,
    pub stem_language: Option<Language>,
    pub max_token_length: Option<usize>,
}

/// Base tokenizer selector for composed analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseTokenizer {
    Standard,
    Whitespace,
    Keyword,
}

/// Named catalog of analyzers. Registration takes a write lock;
/// lookups clone an `Arc` under a read lock and analysis itself runs
/// without any lock held.
pub struct TokenizerRegistry {
    analyzers: RwLock<HashMap<String, Arc<TextAnalyzer>>>,
}

impl Default for TokenizerRegistry {
    fn default() -> Self {
        let registry = TokenizerRegistry {
            analyzers: RwLock::new(HashMap::new()),
        };
        registry.register_defaults();
        registry
    }
}

impl TokenizerRegistry {
    /// An empty registry, without the default set.
    pub fn empty() -> Self {
        TokenizerRegistry {
            analyzers: RwLock::new(HashMap::new()),
        }
    }

    /// Register under `name`, replacing any prior entry with that name.
    pub fn register(&self, name: &str, analyzer: TextAnalyzer) {
        self.analyzers
            .write()
            .insert(name.to_string(), Arc::new(analyzer));
    }

    /// Compose a pipeline over a base tokenizer.
    pub fn register_analyzer(&self, name: &str, base: BaseTokenizer, spec: AnalyzerSpec) {
        let mut analyzer = match base {
            BaseTokenizer::Standard => TextAnalyzer::new(StandardTokenizer),
            BaseTokenizer::Whitespace => TextAnalyzer::new(WhitespaceTokenizer),
            BaseTokenizer::Keyword => TextAnalyzer::new(KeywordTokenizer),
        };
        if let Some(max) = spec.max_token_length {
            analyzer = analyzer.filter(MaxLengthFilter::new(max));
        }
        if spec.lowercase {
            analyzer = analyzer.filter(LowercaseFilter);
        }
        if let Some(lang) = spec.stop_language {
            analyzer = analyzer.filter(StopWordFilter::from_list(stop_words(lang)));
        }
        if let Some(lang) = spec.stem_language {
            analyzer = analyzer.filter(StemmerFilter::new(lang.algorithm()));
        }
        self.register(name, analyzer);
    }

    pub fn register_regex(&self, name: &str, pattern: &str) -> Result<()> {
        let tokenizer = RegexTokenizer::new(pattern).map_err(|e| {
            Error::new(
                ErrorKind::InvalidOptions,
                format!("invalid tokenizer pattern '{}': {}", pattern, e),
            )
        })?;
        self.register(name, TextAnalyzer::new(tokenizer));
        Ok(())
    }

    pub fn register_ngram(&self, name: &str, min: usize, max: usize, edge_only: bool) {
        self.register(
            name,
            TextAnalyzer::new(NgramTokenizer::new(min, max, edge_only)).filter(LowercaseFilter),
        );
    }

    /// Install the built-in set: `default`, `simple`, `keyword`,
    /// `whitespace`, `raw`, plus `<lang>_stem` and `<lang>_text` for
    /// every bundled language.
    pub fn register_defaults(&self) {
        // `default` is the English-stemming text pipeline; plain
        // `simple` keeps tokens unstemmed.
        self.register(
            "default",
            TextAnalyzer::new(StandardTokenizer)
                .filter(MaxLengthFilter::default())
                .filter(LowercaseFilter)
                .filter(StemmerFilter::new(Language::English.algorithm())),
        );
        self.register(
            "simple",
            TextAnalyzer::new(StandardTokenizer).filter(LowercaseFilter),
        );
        self.register("whitespace", TextAnalyzer::new(WhitespaceTokenizer));
        self.register("keyword", TextAnalyzer::new(KeywordTokenizer));
        self.register("raw", TextAnalyzer::new(KeywordTokenizer));
        for lang in ALL_LANGUAGES {
            self.register_analyzer(
                &format!("{}_stem", lang.code()),
                BaseTokenizer::Standard,
                AnalyzerSpec {
                    lowercase: true,
                    stem_language: Some(*lang),
                    ..Default::default()
                },
            );
            self.register_analyzer(
                &format!("{}_text", lang.code()),
                BaseTokenizer::Standard,
                AnalyzerSpec {
                    lowercase: true,
                    stop_language: Some(*lang),
                    stem_language: Some(*lang),
                    ..Default::default()
                },
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<TextAnalyzer>> {
        self.analyzers.read().get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<TextAnalyzer>> {
        self.get(name).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOptions,
                format!("tokenizer '{}' is not registered", name),
            )
        })
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.analyzers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn tokenize(&self, name: &str, text: &str) -> Result<Vec<String>> {
        Ok(self
            .tokenize_detailed(name, text)?
            .into_iter()
            .map(|token| token.text)
            .collect())
    }

    pub fn tokenize_detailed(&self, name: &str, text: &str) -> Result<Vec<Token>> {
        Ok(self.require(name)?.analyze(text))
    }
}
