use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named set of aggregations, the JSON-shaped request of the engine.
///
/// ```json
/// {
///   "by_category": {
///     "terms": { "field": "category", "size": 10 },
///     "aggs": { "avg_price": { "avg": { "field": "price" } } }
///   }
/// }
/// ```
pub type AggregationRequest = BTreeMap<String, Aggregation>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(flatten)]
    pub variant: AggregationVariant,
    /// Nested aggregations evaluated per bucket.
    #[serde(
        rename = "aggs",
        alias = "aggregations",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub sub: AggregationRequest,
}

impl Aggregation {
    pub fn new(variant: AggregationVariant) -> Self {
        Aggregation {
            variant,
            sub: BTreeMap::new(),
        }
    }

    pub fn with_sub(mut self, name: &str, sub: Aggregation) -> Self {
        self.sub.insert(name.to_string(), sub);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationVariant {
    Terms(TermsAggregation),
    Histogram(HistogramAggregation),
    DateHistogram(DateHistogramAggregation),
    Range(RangeAggregation),
    Avg(MetricAggregation),
    Min(MetricAggregation),
    Max(MetricAggregation),
    Sum(MetricAggregation),
    ValueCount(MetricAggregation),
    Stats(MetricAggregation),
    Percentiles(PercentilesAggregation),
}

impl AggregationVariant {
    pub fn is_bucket(&self) -> bool {
        matches!(
            self,
            AggregationVariant::Terms(_)
                | AggregationVariant::Histogram(_)
                | AggregationVariant::DateHistogram(_)
                | AggregationVariant::Range(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

/// Bucket ordering override for terms aggregations, in the familiar
/// `{"order": {"_count": "asc"}}` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermsOrder {
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none", default)]
    pub count: Option<SortDirection>,
    #[serde(rename = "_key", skip_serializing_if = "Option::is_none", default)]
    pub key: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAggregation {
    pub field: String,
    #[serde(default = "default_terms_size")]
    pub size: usize,
    #[serde(default = "default_min_doc_count")]
    pub min_doc_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<TermsOrder>,
}

fn default_terms_size() -> usize {
    10
}

fn default_min_doc_count() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramAggregation {
    pub field: String,
    pub interval: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub min_doc_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_bounds: Option<ExtendedBounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtendedBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarInterval {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateHistogramAggregation {
    pub field: String,
    pub calendar_interval: CalendarInterval,
    /// chrono format string for `key_as_string`; RFC 3339 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeAggregation {
    pub field: String,
    pub ranges: Vec<RangeSpec>,
}

/// Half-open `[from, to)` bucket; a missing end is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregation {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentilesAggregation {
    pub field: String,
    #[serde(default = "default_percents")]
    pub percents: Vec<f64>,
}

pub fn default_percents() -> Vec<f64> {
    vec![1.0, 5.0, 25.0, 50.0, 75.0, 95.0, 99.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_from_es_shape() {
        let json = serde_json::json!({
            "by_category": {
                "terms": { "field": "category", "size": 3 },
                "aggs": {
                    "avg_price": { "avg": { "field": "price" } }
                }
            },
            "price_stats": { "stats": { "field": "price" } }
        });
        let request: AggregationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.len(), 2);
        let by_category = &request["by_category"];
        match &by_category.variant {
            AggregationVariant::Terms(terms) => {
                assert_eq!(terms.field, "category");
                assert_eq!(terms.size, 3);
                assert_eq!(terms.min_doc_count, 1);
            }
            other => panic!("expected terms, got {:?}", other),
        }
        assert_eq!(by_category.sub.len(), 1);
        assert!(matches!(
            request["price_stats"].variant,
            AggregationVariant::Stats(_)
        ));
    }

    #[test]
    fn test_aggregations_alias_accepted() {
        let json = serde_json::json!({
            "h": {
                "histogram": { "field": "price", "interval": 10.0 },
                "aggregations": { "m": { "max": { "field": "price" } } }
            }
        });
        let request: AggregationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request["h"].sub.len(), 1);
    }

    #[test]
    fn test_order_shape() {
        let json = serde_json::json!({
            "t": { "terms": { "field": "tag", "order": { "_key": "desc" } } }
        });
        let request: AggregationRequest = serde_json::from_value(json).unwrap();
        match &request["t"].variant {
            AggregationVariant::Terms(terms) => {
                assert_eq!(terms.order.as_ref().unwrap().key, Some(SortDirection::Desc));
            }
            other => panic!("expected terms, got {:?}", other),
        }
    }

    #[test]
    fn test_request_round_trips() {
        let json = serde_json::json!({
            "d": { "date_histogram": { "field": "ts", "calendar_interval": "month" } }
        });
        let request: AggregationRequest = serde_json::from_value(json.clone()).unwrap();
        let back = serde_json::to_value(&request).unwrap();
        let reparsed: AggregationRequest = serde_json::from_value(back).unwrap();
        assert_eq!(request, reparsed);
    }
}
