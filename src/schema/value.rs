use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::analysis::token::PreTokenizedString;
use crate::schema::facet::Facet;

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    /// Normalized to whole epoch seconds during validation.
    Date(DateTime<Utc>),
    Bytes(Vec<u8>),
    /// Stored as rendered text so the segment codec never has to guess
    /// a self-describing shape.
    Json(#[serde(with = "json_text")] serde_json::Value),
    IpAddr(IpAddr),
    Facet(Facet),
    /// Caller-supplied token stream; bypasses the field analyzer.
    PreTokenized(PreTokenizedString),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::IpAddr(_) => "ip",
            Value::Facet(_) => "facet",
            Value::PreTokenized(_) => "pretokenized",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// JSON rendering used for stored-document echo and shard transport.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(text) => serde_json::Value::String(text.clone()),
            Value::U64(v) => serde_json::json!(v),
            Value::I64(v) => serde_json::json!(v),
            Value::F64(v) => serde_json::json!(v),
            Value::Bool(v) => serde_json::json!(v),
            Value::Date(dt) => {
                serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Value::Bytes(bytes) => serde_json::Value::String(base64::encode(bytes)),
            Value::Json(json) => json.clone(),
            Value::IpAddr(ip) => serde_json::Value::String(ip.to_string()),
            Value::Facet(facet) => serde_json::Value::String(facet.as_str().to_string()),
            Value::PreTokenized(pre) => serde_json::Value::String(pre.text.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

mod json_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &serde_json::Value,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<serde_json::Value, D::Error> {
        let text = String::deserialize(deserializer)?;
        serde_json::from_str(&text).map_err(serde::de::Error::custom)
    }
}

/// Truncate to whole seconds; sub-second precision is not retained by
/// the engine.
pub fn normalize_date(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(dt.timestamp(), 0)
        .single()
        .unwrap_or(dt)
}
