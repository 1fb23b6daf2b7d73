use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregation results keyed by request name; the shape mirrors the
/// request.
pub type AggregationResults = BTreeMap<String, AggregationResult>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregationResult {
    Buckets { buckets: Vec<BucketEntry> },
    Metric(MetricResult),
}

impl AggregationResult {
    pub fn buckets(&self) -> Option<&[BucketEntry]> {
        match self {
            AggregationResult::Buckets { buckets } => Some(buckets),
            AggregationResult::Metric(_) => None,
        }
    }

    pub fn metric_value(&self) -> Option<f64> {
        match self {
            AggregationResult::Metric(MetricResult::Value { value }) => *value,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BucketKey {
    Num(f64),
    Str(String),
}

impl BucketKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BucketKey::Str(key) => Some(key),
            BucketKey::Num(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BucketKey::Num(key) => Some(*key),
            BucketKey::Str(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketEntry {
    pub key: BucketKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
    /// Sub-aggregation results, flattened beside the bucket fields.
    #[serde(flatten)]
    pub sub: AggregationResults,
}

impl BucketEntry {
    pub fn new(key: BucketKey, doc_count: u64) -> Self {
        BucketEntry {
            key,
            key_as_string: None,
            doc_count,
            from: None,
            to: None,
            sub: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricResult {
    Value {
        value: Option<f64>,
    },
    Stats {
        count: u64,
        min: Option<f64>,
        max: Option<f64>,
        sum: f64,
        avg: Option<f64>,
    },
    Percentiles {
        values: BTreeMap<String, f64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_serialization_shape() {
        let mut entry = BucketEntry::new(BucketKey::Str("x".to_string()), 4);
        entry.sub.insert(
            "avg_price".to_string(),
            AggregationResult::Metric(MetricResult::Value { value: Some(12.5) }),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["key"], "x");
        assert_eq!(json["doc_count"], 4);
        assert_eq!(json["avg_price"]["value"], 12.5);
        assert!(json.get("from").is_none());
    }

    #[test]
    fn test_stats_serialization() {
        let result = AggregationResult::Metric(MetricResult::Stats {
            count: 2,
            min: Some(1.0),
            max: Some(3.0),
            sum: 4.0,
            avg: Some(2.0),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["avg"], 2.0);
    }
}
