use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};
use crate::schema::{FieldType, Schema, Value};

/// How a clause participates in a Boolean query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occur {
    /// Matches are required and contribute to the score.
    Must,
    /// Optional, score-contributing. Required if no Must/Filter clause
    /// is present.
    Should,
    /// Matches are excluded.
    MustNot,
    /// Required but scoreless.
    Filter,
}

/// One end of a range query. `Unbounded` is the `*` of the query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryBound {
    Unbounded,
    Included(Value),
    Excluded(Value),
}

impl QueryBound {
    pub fn value(&self) -> Option<&Value> {
        match self {
            QueryBound::Unbounded => None,
            QueryBound::Included(v) | QueryBound::Excluded(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub terms: Vec<String>,
    pub slop: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    pub lower: QueryBound,
    pub upper: QueryBound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanQuery {
    pub clauses: Vec<(Occur, Query)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyQuery {
    pub field: String,
    pub term: String,
    pub max_edits: u8,
    /// Leading characters that must match exactly.
    pub prefix_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    /// `*` matches any run, `?` a single character.
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetQuery {
    pub field: String,
    /// Matches facet values at or under this path.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexQuery {
    pub field: String,
    pub pattern: String,
}

/// Tagged query tree. Built programmatically or by the query-string
/// parser; validated against a schema before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),
    Phrase(PhraseQuery),
    Range(RangeQuery),
    Boolean(BooleanQuery),
    Fuzzy(FuzzyQuery),
    Wildcard(WildcardQuery),
    Facet(FacetQuery),
    Regex(RegexQuery),
    /// Multiplies the inner query's score contribution.
    Boost(Box<Query>, f32),
    MatchAll,
}

pub const MAX_FUZZY_EDITS: u8 = 2;

impl Query {
    pub fn term(field: &str, value: &str) -> Query {
        Query::Term(TermQuery {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    pub fn phrase(field: &str, terms: &[&str], slop: u32) -> Query {
        Query::Phrase(PhraseQuery {
            field: field.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
            slop,
        })
    }

    pub fn range(field: &str, lower: QueryBound, upper: QueryBound) -> Query {
        Query::Range(RangeQuery {
            field: field.to_string(),
            lower,
            upper,
        })
    }

    pub fn boolean(clauses: Vec<(Occur, Query)>) -> Query {
        Query::Boolean(BooleanQuery { clauses })
    }

    pub fn fuzzy(field: &str, term: &str, max_edits: u8, prefix_len: usize) -> Query {
        Query::Fuzzy(FuzzyQuery {
            field: field.to_string(),
            term: term.to_string(),
            max_edits,
            prefix_len,
        })
    }

    pub fn wildcard(field: &str, pattern: &str) -> Query {
        Query::Wildcard(WildcardQuery {
            field: field.to_string(),
            pattern: pattern.to_string(),
        })
    }

    pub fn facet(field: &str, path: &str) -> Query {
        Query::Facet(FacetQuery {
            field: field.to_string(),
            path: path.to_string(),
        })
    }

    pub fn regex(field: &str, pattern: &str) -> Query {
        Query::Regex(RegexQuery {
            field: field.to_string(),
            pattern: pattern.to_string(),
        })
    }

    pub fn boost(self, boost: f32) -> Query {
        Query::Boost(Box::new(self), boost)
    }

    /// Check field references, index requirements, and variant limits.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        match self {
            Query::MatchAll => Ok(()),
            Query::Boost(inner, _) => inner.validate(schema),
            Query::Boolean(boolean) => {
                for (_, clause) in &boolean.clauses {
                    clause.validate(schema)?;
                }
                Ok(())
            }
            Query::Term(q) => require_indexed(schema, &q.field).map(|_| ()),
            Query::Phrase(q) => {
                let entry = require_indexed(schema, &q.field)?;
                if !entry.has_positions() {
                    return Err(Error::new(
                        ErrorKind::PositionsNotStored,
                        format!("field '{}' does not record positions", q.field),
                    ));
                }
                Ok(())
            }
            Query::Range(q) => {
                let entry = require_indexed_or_fast(schema, &q.field)?;
                for bound in [&q.lower, &q.upper] {
                    if let Some(value) = bound.value() {
                        check_range_value(entry.field_type, value, &q.field)?;
                    }
                }
                Ok(())
            }
            Query::Fuzzy(q) => {
                require_indexed(schema, &q.field)?;
                if q.max_edits > MAX_FUZZY_EDITS {
                    return Err(Error::new(
                        ErrorKind::FuzzyEditsOutOfRange,
                        format!("max_edits {} exceeds cap {}", q.max_edits, MAX_FUZZY_EDITS),
                    ));
                }
                Ok(())
            }
            Query::Wildcard(q) => {
                require_indexed(schema, &q.field)?;
                if q.pattern.starts_with('*') {
                    log::warn!(
                        "wildcard pattern '{}' has a leading '*': full dictionary scan",
                        q.pattern
                    );
                }
                Ok(())
            }
            Query::Regex(q) => require_indexed(schema, &q.field).map(|_| ()),
            Query::Facet(q) => {
                let entry = require_indexed(schema, &q.field)?;
                if entry.field_type != FieldType::Facet {
                    return Err(Error::new(
                        ErrorKind::RangeTypeMismatch,
                        format!("field '{}' is not a facet field", q.field),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn require_indexed<'a>(
    schema: &'a Schema,
    field: &str,
) -> Result<&'a crate::schema::FieldEntry> {
    let handle = schema.field_by_name(field)?;
    let entry = schema.field_entry(handle);
    if !entry.is_indexed() {
        return Err(Error::new(
            ErrorKind::FieldNotIndexed,
            format!("field '{}' is not indexed", field),
        ));
    }
    Ok(entry)
}

/// Ranges run off the fast column when available, falling back to the
/// dictionary; either capability suffices.
fn require_indexed_or_fast<'a>(
    schema: &'a Schema,
    field: &str,
) -> Result<&'a crate::schema::FieldEntry> {
    let handle = schema.field_by_name(field)?;
    let entry = schema.field_entry(handle);
    if !entry.is_indexed() && !entry.is_fast() {
        return Err(Error::new(
            ErrorKind::FieldNotIndexed,
            format!("field '{}' is neither indexed nor fast", field),
        ));
    }
    Ok(entry)
}

fn check_range_value(field_type: FieldType, value: &Value, field: &str) -> Result<()> {
    let compatible = match field_type {
        FieldType::U64 | FieldType::I64 | FieldType::F64 => matches!(
            value,
            Value::U64(_) | Value::I64(_) | Value::F64(_) | Value::Text(_)
        ),
        FieldType::Date => matches!(value, Value::Date(_) | Value::Text(_) | Value::I64(_)),
        FieldType::Bool => matches!(value, Value::Bool(_) | Value::Text(_)),
        FieldType::Text | FieldType::Bytes | FieldType::Json => {
            matches!(value, Value::Text(_))
        }
        FieldType::IpAddr => matches!(value, Value::IpAddr(_) | Value::Text(_)),
        FieldType::Facet => false,
    };
    if compatible {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::RangeTypeMismatch,
            format!(
                "range bound {} does not fit field '{}' of type {:?}",
                value.type_name(),
                field,
                field_type
            ),
        ))
    }
}
