use std::sync::Arc;

use crate::analysis::TokenizerRegistry;
use crate::core::error::{Error, Result};
use crate::query::ast::{Occur, Query, QueryBound, MAX_FUZZY_EDITS};
use crate::schema::{FieldType, Schema, Value};

/// Parser for the human-readable query syntax:
///
/// ```text
/// title:quick "brown fox"~2 price:[10 TO 100} (tag:a OR tag:b)^2 NOT tag:c fo?x fuzzy~1
/// ```
///
/// Adjacent clauses combine with AND unless `or_by_default` is set.
/// Text terms run through the field's analyzer; wildcard and fuzzy
/// words are only lowercased, since stemming would corrupt patterns.
pub struct QueryParser {
    schema: Schema,
    registry: Arc<TokenizerRegistry>,
    default_fields: Vec<String>,
    or_by_default: bool,
}

impl QueryParser {
    pub fn new(
        schema: Schema,
        registry: Arc<TokenizerRegistry>,
        default_fields: Vec<String>,
    ) -> Self {
        QueryParser {
            schema,
            registry,
            default_fields,
            or_by_default: false,
        }
    }

    /// Combine adjacent clauses with OR instead of AND.
    pub fn or_by_default(mut self) -> Self {
        self.or_by_default = true;
        self
    }

    pub fn parse(&self, input: &str) -> Result<Query> {
        let mut cursor = Cursor::new(input);
        cursor.skip_ws();
        if cursor.eof() {
            return Ok(Query::MatchAll);
        }
        let query = self
            .parse_disjunction(&mut cursor, &self.default_fields)?
            .unwrap_or(Query::MatchAll);
        cursor.skip_ws();
        if !cursor.eof() {
            return Err(cursor.error("unexpected trailing input"));
        }
        query.validate(&self.schema)?;
        Ok(query)
    }

    fn parse_disjunction(&self, cursor: &mut Cursor, fields: &[String]) -> Result<Option<Query>> {
        let mut arms: Vec<Query> = Vec::new();
        if let Some(arm) = self.parse_conjunction(cursor, fields)? {
            arms.push(arm);
        }
        loop {
            cursor.skip_ws();
            if !cursor.consume_keyword("OR") {
                break;
            }
            cursor.skip_ws();
            if cursor.eof() {
                return Err(cursor.error("expected a clause after OR"));
            }
            if let Some(arm) = self.parse_conjunction(cursor, fields)? {
                arms.push(arm);
            }
        }
        Ok(match arms.len() {
            0 => None,
            1 => Some(arms.pop().unwrap()),
            _ => Some(Query::boolean(
                arms.into_iter().map(|arm| (Occur::Should, arm)).collect(),
            )),
        })
    }

    fn parse_conjunction(&self, cursor: &mut Cursor, fields: &[String]) -> Result<Option<Query>> {
        let mut clauses: Vec<(Occur, Query)> = Vec::new();
        loop {
            cursor.skip_ws();
            if cursor.eof() || cursor.peek() == Some(')') || cursor.at_keyword("OR") {
                break;
            }
            let explicit_and = cursor.consume_keyword("AND");
            cursor.skip_ws();
            let negated = cursor.consume_keyword("NOT");
            cursor.skip_ws();
            if cursor.eof() || cursor.peek() == Some(')') {
                if negated || explicit_and {
                    return Err(cursor.error("dangling operator"));
                }
                break;
            }
            let clause = self.parse_clause(cursor, fields)?;
            if let Some(query) = clause {
                let occur = if negated {
                    Occur::MustNot
                } else if explicit_and || !self.or_by_default {
                    Occur::Must
                } else {
                    Occur::Should
                };
                clauses.push((occur, query));
            }
        }
        Ok(match clauses.len() {
            0 => None,
            1 if clauses[0].0 != Occur::MustNot => Some(clauses.pop().unwrap().1),
            _ => Some(Query::Boolean(crate::query::ast::BooleanQuery { clauses })),
        })
    }

    /// One clause: optional `field:` prefix, then a term, phrase, range
    /// or parenthesized group, then optional `^boost`.
    fn parse_clause(&self, cursor: &mut Cursor, fields: &[String]) -> Result<Option<Query>> {
        let field_override = cursor.try_field_prefix();
        let scoped: Vec<String>;
        let fields: &[String] = match field_override {
            Some(name) => {
                scoped = vec![name];
                &scoped
            }
            None => fields,
        };

        let query = match cursor.peek() {
            Some('(') => {
                cursor.bump();
                let inner = self.parse_disjunction(cursor, fields)?;
                cursor.skip_ws();
                if !cursor.consume_char(')') {
                    return Err(cursor.error("expected ')'"));
                }
                inner
            }
            Some('"') => Some(self.parse_phrase(cursor, fields)?),
            Some('[') | Some('{') => Some(self.parse_range(cursor, fields)?),
            _ => self.parse_term_word(cursor, fields)?,
        };

        // Optional boost applies to whatever the clause produced; `^`
        // binds tightly, so no whitespace is skipped first.
        if cursor.consume_char('^') {
            let boost = cursor.parse_f32()?;
            return Ok(query.map(|q| q.boost(boost)));
        }
        Ok(query)
    }

    fn parse_phrase(&self, cursor: &mut Cursor, fields: &[String]) -> Result<Query> {
        let start = cursor.pos;
        cursor.bump(); // opening quote
        let mut text = String::new();
        loop {
            match cursor.peek() {
                None => return Err(Error::parse(start, "unterminated phrase")),
                Some('"') => {
                    cursor.bump();
                    break;
                }
                Some('\\') => {
                    cursor.bump();
                    match cursor.peek() {
                        Some(escaped @ ('"' | '\\')) => {
                            text.push(escaped);
                            cursor.bump();
                        }
                        _ => return Err(cursor.error("invalid escape in phrase")),
                    }
                }
                Some(ch) => {
                    text.push(ch);
                    cursor.bump();
                }
            }
        }
        let slop = if cursor.consume_char('~') {
            cursor.parse_u32()?
        } else {
            0
        };

        let field = self.single_field(fields, start)?;
        let entry = self
            .schema
            .field_by_name(&field)
            .map_err(|e| Error::parse(start, e.context))
            .map(|handle| self.schema.field_entry(handle))?;
        let analyzer_name = entry.options.tokenizer_name();
        let terms: Vec<String> = self
            .registry
            .tokenize(analyzer_name, &text)
            .map_err(|e| Error::parse(start, e.context))?;
        match terms.len() {
            0 => Err(Error::parse(start, "phrase has no tokens after analysis")),
            1 => Ok(Query::Term(crate::query::ast::TermQuery {
                field,
                value: terms.into_iter().next().unwrap(),
            })),
            _ => Ok(Query::Phrase(crate::query::ast::PhraseQuery {
                field,
                terms,
                slop,
            })),
        }
    }

    fn parse_range(&self, cursor: &mut Cursor, fields: &[String]) -> Result<Query> {
        let start = cursor.pos;
        let lower_inclusive = match cursor.peek() {
            Some('[') => true,
            Some('{') => false,
            _ => return Err(cursor.error("expected '[' or '{'")),
        };
        cursor.bump();

        let lower_literal = cursor.parse_range_literal()?;
        cursor.skip_ws();
        if !cursor.consume_keyword("TO") {
            return Err(cursor.error("expected 'TO'"));
        }
        cursor.skip_ws();
        let upper_literal = cursor.parse_range_literal()?;
        cursor.skip_ws();
        let upper_inclusive = match cursor.peek() {
            Some(']') => true,
            Some('}') => false,
            _ => return Err(cursor.error("expected ']' or '}'")),
        };
        cursor.bump();

        let field = self.single_field(fields, start)?;
        let bound = |literal: Option<String>, inclusive: bool| match literal {
            None => QueryBound::Unbounded,
            Some(text) => {
                let value = Value::Text(text);
                if inclusive {
                    QueryBound::Included(value)
                } else {
                    QueryBound::Excluded(value)
                }
            }
        };
        Ok(Query::range(
            &field,
            bound(lower_literal, lower_inclusive),
            bound(upper_literal, upper_inclusive),
        ))
    }

    fn parse_term_word(&self, cursor: &mut Cursor, fields: &[String]) -> Result<Option<Query>> {
        let start = cursor.pos;
        let word = cursor.take_word();
        if word.is_empty() {
            return Err(cursor.error("expected a term"));
        }

        // Bare `*` matches all live documents.
        if word == "*" {
            // A possible `~` suffix makes no sense here.
            return Ok(Some(Query::MatchAll));
        }

        // `~` suffix: fuzzy term with optional edit distance.
        if cursor.consume_char('~') {
            let max_edits = match cursor.peek() {
                Some(digit) if digit.is_ascii_digit() => cursor.parse_u32()? as u8,
                _ => MAX_FUZZY_EDITS,
            };
            let queries = self.fields_to_queries(fields, start, |field, entry| {
                let term = if entry.field_type == FieldType::Text {
                    word.to_lowercase()
                } else {
                    word.clone()
                };
                Ok(Some(Query::fuzzy(field, &term, max_edits, 0)))
            })?;
            return Ok(self.combine_fields(queries));
        }

        if word.contains('*') || word.contains('?') {
            let queries = self.fields_to_queries(fields, start, |field, entry| {
                let pattern = if entry.field_type == FieldType::Text {
                    word.to_lowercase()
                } else {
                    word.clone()
                };
                Ok(Some(Query::wildcard(field, &pattern)))
            })?;
            return Ok(self.combine_fields(queries));
        }

        let queries = self.fields_to_queries(fields, start, |field, entry| {
            match entry.field_type {
                FieldType::Facet => Ok(Some(Query::facet(field, &word))),
                FieldType::Text => {
                    let terms = self
                        .registry
                        .tokenize(entry.options.tokenizer_name(), &word)
                        .map_err(|e| Error::parse(start, e.context))?;
                    match terms.len() {
                        0 => Ok(None),
                        1 => Ok(Some(Query::term(
                            field,
                            &terms.into_iter().next().unwrap(),
                        ))),
                        _ => {
                            if entry.has_positions() {
                                Ok(Some(Query::Phrase(crate::query::ast::PhraseQuery {
                                    field: field.to_string(),
                                    terms,
                                    slop: 0,
                                })))
                            } else {
                                Ok(Some(Query::boolean(
                                    terms
                                        .into_iter()
                                        .map(|t| (Occur::Must, Query::term(field, &t)))
                                        .collect(),
                                )))
                            }
                        }
                    }
                }
                _ => Ok(Some(Query::term(field, &word))),
            }
        })?;
        Ok(self.combine_fields(queries))
    }

    fn fields_to_queries(
        &self,
        fields: &[String],
        position: usize,
        mut make: impl FnMut(&str, &crate::schema::FieldEntry) -> Result<Option<Query>>,
    ) -> Result<Vec<Query>> {
        if fields.is_empty() {
            return Err(Error::parse(
                position,
                "no field given and the parser has no default fields",
            ));
        }
        let mut queries = Vec::new();
        for name in fields {
            let handle = self
                .schema
                .field_by_name(name)
                .map_err(|e| Error::parse(position, e.context))?;
            let entry = self.schema.field_entry(handle);
            if let Some(query) = make(name, entry)? {
                queries.push(query);
            }
        }
        Ok(queries)
    }

    fn combine_fields(&self, mut queries: Vec<Query>) -> Option<Query> {
        match queries.len() {
            0 => None,
            1 => Some(queries.pop().unwrap()),
            _ => Some(Query::boolean(
                queries.into_iter().map(|q| (Occur::Should, q)).collect(),
            )),
        }
    }

    fn single_field(&self, fields: &[String], position: usize) -> Result<String> {
        match fields {
            [one] => Ok(one.clone()),
            [] => Err(Error::parse(position, "this clause requires a field")),
            _ => Err(Error::parse(
                position,
                "this clause requires exactly one field",
            )),
        }
    }
}

// --------------------------------------------------------------- lexer

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.pos, message)
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.starts_with(keyword)
            && match rest[keyword.len()..].chars().next() {
                None => true,
                Some(ch) => ch.is_ascii_whitespace() || ch == '(' || ch == ')' || ch == '"',
            }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// `ident:` lookahead; consumes and returns the field name only when
    /// the colon is present.
    fn try_field_prefix(&mut self) -> Option<String> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, first)) if first.is_ascii_alphabetic() || first == '_' => {}
            _ => return None,
        }
        let mut end = 0;
        for (offset, ch) in rest.char_indices() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                end = offset + ch.len_utf8();
            } else {
                break;
            }
        }
        if rest[end..].starts_with(':') {
            let name = rest[..end].to_string();
            self.pos += end + 1;
            Some(name)
        } else {
            None
        }
    }

    fn take_word(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace()
                || matches!(ch, '(' | ')' | '"' | '^' | '~' | '[' | '{' | ']' | '}')
            {
                break;
            }
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_u32(&mut self) -> Result<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.bump();
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| Error::parse(start, "expected an integer"))
    }

    fn parse_f32(&mut self) -> Result<f32> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit() || ch == '.') {
            self.bump();
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| Error::parse(start, "expected a number"))
    }

    /// A range bound: `*`, a quoted literal, or a bare word.
    fn parse_range_literal(&mut self) -> Result<Option<String>> {
        self.skip_ws();
        if self.consume_char('*') {
            return Ok(None);
        }
        if self.peek() == Some('"') {
            let start = self.pos;
            self.bump();
            let mut text = String::new();
            loop {
                match self.peek() {
                    None => return Err(Error::parse(start, "unterminated literal")),
                    Some('"') => {
                        self.bump();
                        return Ok(Some(text));
                    }
                    Some(ch) => {
                        text.push(ch);
                        self.bump();
                    }
                }
            }
        }
        let word = self.take_word();
        if word.is_empty() {
            return Err(self.error("expected a range bound"));
        }
        Ok(Some(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::query::ast::{FuzzyQuery, PhraseQuery, TermQuery, WildcardQuery};
    use crate::schema::FieldOptions;

    fn parser() -> QueryParser {
        let mut builder = Schema::builder();
        builder
            .add_text_field("title", FieldOptions::text_stored())
            .unwrap();
        builder
            .add_text_field("tag", FieldOptions::indexed().with_tokenizer("simple"))
            .unwrap();
        builder
            .add_f64_field("price", FieldOptions::fast())
            .unwrap();
        builder
            .add_facet_field("category", FieldOptions::default())
            .unwrap();
        let schema = builder.build();
        QueryParser::new(
            schema,
            Arc::new(TokenizerRegistry::default()),
            vec!["title".to_string()],
        )
    }

    #[test]
    fn test_bare_term_uses_default_field_and_analyzer() {
        let query = parser().parse("Foxes").unwrap();
        assert_eq!(
            query,
            Query::Term(TermQuery {
                field: "title".to_string(),
                value: "fox".to_string(),
            })
        );
    }

    #[test]
    fn test_field_prefix() {
        let query = parser().parse("tag:Rust").unwrap();
        assert_eq!(
            query,
            Query::Term(TermQuery {
                field: "tag".to_string(),
                value: "rust".to_string(),
            })
        );
    }

    #[test]
    fn test_adjacent_terms_default_to_and() {
        let query = parser().parse("quick fox").unwrap();
        match query {
            Query::Boolean(boolean) => {
                assert_eq!(boolean.clauses.len(), 2);
                assert!(boolean.clauses.iter().all(|(occur, _)| *occur == Occur::Must));
            }
            other => panic!("expected boolean, got {:?}", other),
        }
    }

    #[test]
    fn test_or_and_not() {
        let query = parser().parse("(tag:a OR tag:b) AND NOT tag:c").unwrap();
        match query {
            Query::Boolean(boolean) => {
                assert_eq!(boolean.clauses.len(), 2);
                assert_eq!(boolean.clauses[0].0, Occur::Must);
                assert_eq!(boolean.clauses[1].0, Occur::MustNot);
                match &boolean.clauses[0].1 {
                    Query::Boolean(inner) => {
                        assert!(inner.clauses.iter().all(|(o, _)| *o == Occur::Should))
                    }
                    other => panic!("expected inner boolean, got {:?}", other),
                }
            }
            other => panic!("expected boolean, got {:?}", other),
        }
    }

    #[test]
    fn test_phrase_with_slop() {
        let query = parser().parse("\"quick brown fox\"~2").unwrap();
        assert_eq!(
            query,
            Query::Phrase(PhraseQuery {
                field: "title".to_string(),
                terms: vec!["quick".to_string(), "brown".to_string(), "fox".to_string()],
                slop: 2,
            })
        );
    }

    #[test]
    fn test_phrase_with_escaped_quote() {
        let query = parser().parse("\"say \\\"hi\\\"\"").unwrap();
        match query {
            Query::Phrase(phrase) => assert_eq!(phrase.terms, vec!["say", "hi"]),
            Query::Term(term) => panic!("unexpected term {:?}", term),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_range_brackets_and_braces() {
        let query = parser().parse("price:[10 TO 100}").unwrap();
        match query {
            Query::Range(range) => {
                assert_eq!(range.field, "price");
                assert_eq!(
                    range.lower,
                    QueryBound::Included(Value::Text("10".to_string()))
                );
                assert_eq!(
                    range.upper,
                    QueryBound::Excluded(Value::Text("100".to_string()))
                );
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_open_ended_range() {
        let query = parser().parse("price:[50 TO *]").unwrap();
        match query {
            Query::Range(range) => {
                assert_eq!(range.upper, QueryBound::Unbounded);
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_fuzzy_and_wildcard_words() {
        let query = parser().parse("foks~1").unwrap();
        assert_eq!(
            query,
            Query::Fuzzy(FuzzyQuery {
                field: "title".to_string(),
                term: "foks".to_string(),
                max_edits: 1,
                prefix_len: 0,
            })
        );

        let query = parser().parse("fo?es*").unwrap();
        assert_eq!(
            query,
            Query::Wildcard(WildcardQuery {
                field: "title".to_string(),
                pattern: "fo?es*".to_string(),
            })
        );
    }

    #[test]
    fn test_field_group_distribution() {
        let query = parser().parse("tag:(a b)").unwrap();
        match query {
            Query::Boolean(boolean) => {
                for (occur, clause) in &boolean.clauses {
                    assert_eq!(*occur, Occur::Must);
                    match clause {
                        Query::Term(term) => assert_eq!(term.field, "tag"),
                        other => panic!("expected term, got {:?}", other),
                    }
                }
            }
            other => panic!("expected boolean, got {:?}", other),
        }
    }

    #[test]
    fn test_boost_suffix() {
        let query = parser().parse("title:fox^2.5").unwrap();
        match query {
            Query::Boost(inner, boost) => {
                assert_eq!(boost, 2.5);
                assert!(matches!(*inner, Query::Term(_)));
            }
            other => panic!("expected boost, got {:?}", other),
        }
    }

    #[test]
    fn test_facet_path_clause() {
        let query = parser().parse("category:/books/rust").unwrap();
        assert_eq!(query, Query::facet("category", "/books/rust"));
    }

    #[test]
    fn test_empty_input_is_match_all() {
        assert_eq!(parser().parse("").unwrap(), Query::MatchAll);
        assert_eq!(parser().parse("*").unwrap(), Query::MatchAll);
    }

    #[test]
    fn test_parse_errors_carry_position() {
        let err = parser().parse("price:[10 TO").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Parse { .. }));

        let err = parser().parse("\"unterminated").unwrap_err();
        match err.kind {
            ErrorKind::Parse { position } => assert_eq!(position, 0),
            other => panic!("expected parse error, got {:?}", other),
        }

        let err = parser().parse("missing:field").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Parse { .. }));
    }

    #[test]
    fn test_unknown_field_is_positional_error() {
        let err = parser().parse("nope:value").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Parse { .. }));
    }

    #[test]
    fn test_or_by_default() {
        let parser = parser().or_by_default();
        let query = parser.parse("quick fox").unwrap();
        match query {
            Query::Boolean(boolean) => {
                assert!(boolean
                    .clauses
                    .iter()
                    .all(|(occur, _)| *occur == Occur::Should));
            }
            other => panic!("expected boolean, got {:?}", other),
        }
    }
}
