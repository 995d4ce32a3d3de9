//! Generic relational value representation
//!
//! [`SqlData`] is what the relational backend exchanges: scalar columns plus JSON
//! documents. Types JSON cannot express natively travel as tagged objects produced by
//! [`crate::codec::tagged`].

use crate::value::Number;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlData {
    #[default]
    Null,
    Boolean(bool),
    String(String),
    Number(Number),
    Timestamp(DateTime<Utc>),
    /// Only produced by the strict codec for typed columns
    Date(NaiveDate),
    /// Only produced by the strict codec for typed columns
    Time(NaiveTime),
    Binary(Vec<u8>),
    Array(Vec<SqlData>),
    Object(BTreeMap<String, SqlData>),
}

impl SqlData {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlData::Null)
    }

    /// Structural conversion to JSON.
    ///
    /// Lossless for the output of the tagged codec, where numbers other than floats
    /// and every non-JSON scalar are already wrapped in tag objects.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            SqlData::Null => Json::Null,
            SqlData::Boolean(b) => Json::Bool(*b),
            SqlData::String(s) => Json::String(s.clone()),
            SqlData::Number(Number::Signed(n)) => Json::from(*n),
            SqlData::Number(Number::Unsigned(n)) => Json::from(*n),
            SqlData::Number(Number::Float(n)) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            SqlData::Number(Number::Decimal(d)) => Json::String(d.to_string()),
            SqlData::Timestamp(t) => Json::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            SqlData::Date(d) => Json::String(d.to_string()),
            SqlData::Time(t) => Json::String(t.to_string()),
            SqlData::Binary(bytes) => Json::String(STANDARD.encode(bytes)),
            SqlData::Array(items) => Json::Array(items.iter().map(SqlData::to_json).collect()),
            SqlData::Object(map) => Json::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(json: &serde_json::Value) -> SqlData {
        use serde_json::Value as Json;

        match json {
            Json::Null => SqlData::Null,
            Json::Bool(b) => SqlData::Boolean(*b),
            Json::String(s) => SqlData::String(s.clone()),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlData::Number(Number::Signed(i))
                } else if let Some(u) = n.as_u64() {
                    SqlData::Number(Number::Unsigned(u))
                } else {
                    SqlData::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Json::Array(items) => SqlData::Array(items.iter().map(SqlData::from_json).collect()),
            Json::Object(map) => SqlData::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), SqlData::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for SqlData {
    fn from(val: &str) -> Self {
        SqlData::String(val.to_string())
    }
}

impl From<String> for SqlData {
    fn from(val: String) -> Self {
        SqlData::String(val)
    }
}

impl From<BTreeMap<String, SqlData>> for SqlData {
    fn from(val: BTreeMap<String, SqlData>) -> Self {
        SqlData::Object(val)
    }
}
