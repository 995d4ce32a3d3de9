//! Strict relational codec for typed columns
//!
//! Top-level scalars map to their column type unchanged. Composite values become
//! JSON documents whose children use the tagged encoding.

use crate::codec::tagged;
use crate::types::SqlData;
use crate::value::Value;

pub fn encode(value: &Value) -> SqlData {
    match value {
        Value::Null => SqlData::Null,
        Value::Boolean(b) => SqlData::Boolean(*b),
        Value::String(s) => SqlData::String(s.clone()),
        Value::Number(n) => SqlData::Number(n.clone()),
        Value::Timestamp(t) => SqlData::Timestamp(*t),
        Value::Date(d) => SqlData::Date(*d),
        Value::Time(t) => SqlData::Time(*t),
        Value::Binary(bytes) => SqlData::Binary(bytes.clone()),
        Value::Array(items) => SqlData::Array(items.iter().map(tagged::encode).collect()),
        Value::Object(map) => SqlData::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), tagged::encode(value)))
                .collect(),
        ),
    }
}

pub fn decode(data: &SqlData) -> Value {
    match data {
        SqlData::Array(items) => Value::Array(items.iter().map(tagged::decode).collect()),
        SqlData::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), tagged::decode(value)))
                .collect(),
        ),
        scalar => tagged::decode(scalar),
    }
}
