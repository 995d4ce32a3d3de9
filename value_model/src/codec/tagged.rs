//! Tagged object encoding
//!
//! Values JSON cannot carry exactly are wrapped in a single-key object whose key is a
//! reserved tag. A user object that happens to look like a tag object is itself
//! wrapped in `$object`, so decoding never has to guess.

use crate::types::SqlData;
use crate::value::{Number, Value};
use base64::{engine::general_purpose::STANDARD, Engine};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const SIGNED: &str = "$signed";
pub const UNSIGNED: &str = "$unsigned";
pub const DECIMAL: &str = "$decimal";
pub const BINARY: &str = "$binary";
pub const DATE: &str = "$date";
pub const OBJECT: &str = "$object";
pub const CALENDAR: &str = "$calendar";

pub const RESERVED_TAGS: [&str; 7] = [SIGNED, UNSIGNED, DECIMAL, BINARY, DATE, OBJECT, CALENDAR];

pub fn is_reserved_tag(key: &str) -> bool {
    RESERVED_TAGS.contains(&key)
}

fn tag(key: &str, payload: SqlData) -> SqlData {
    let mut map = BTreeMap::new();
    map.insert(key.to_string(), payload);
    SqlData::Object(map)
}

pub fn encode(value: &Value) -> SqlData {
    match value {
        Value::Null => SqlData::Null,
        Value::Boolean(b) => SqlData::Boolean(*b),
        Value::String(s) => SqlData::String(s.clone()),
        Value::Number(Number::Signed(n)) => tag(SIGNED, SqlData::String(n.to_string())),
        Value::Number(Number::Unsigned(n)) => tag(UNSIGNED, SqlData::String(n.to_string())),
        Value::Number(Number::Decimal(d)) => tag(DECIMAL, SqlData::String(d.to_string())),
        Value::Number(Number::Float(n)) => SqlData::Number(Number::Float(*n)),
        Value::Timestamp(t) => tag(DATE, SqlData::String(t.timestamp_millis().to_string())),
        Value::Date(date) => tag(CALENDAR, SqlData::String(date.to_string())),
        Value::Time(time) => tag(CALENDAR, SqlData::String(time.to_string())),
        Value::Binary(bytes) => tag(BINARY, SqlData::String(STANDARD.encode(bytes))),
        Value::Array(items) => SqlData::Array(items.iter().map(encode).collect()),
        Value::Object(map) => {
            let encoded = encode_fields(map);
            if map.len() == 1 && map.keys().all(|key| is_reserved_tag(key)) {
                tag(OBJECT, SqlData::Object(encoded))
            } else {
                SqlData::Object(encoded)
            }
        }
    }
}

fn encode_fields(map: &BTreeMap<String, Value>) -> BTreeMap<String, SqlData> {
    map.iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

/// Total: malformed tag objects decode as plain objects.
pub fn decode(data: &SqlData) -> Value {
    match data {
        SqlData::Null => Value::Null,
        SqlData::Boolean(b) => Value::Boolean(*b),
        SqlData::String(s) => Value::String(s.clone()),
        SqlData::Number(n) => Value::Number(n.clone()),
        SqlData::Timestamp(t) => Value::Timestamp(*t),
        SqlData::Date(d) => Value::Date(*d),
        SqlData::Time(t) => Value::Time(*t),
        SqlData::Binary(bytes) => Value::Binary(bytes.clone()),
        SqlData::Array(items) => Value::Array(items.iter().map(decode).collect()),
        SqlData::Object(map) => {
            if map.len() == 1 {
                if let Some((key, payload)) = map.iter().next() {
                    if let Some(value) = decode_tag(key, payload) {
                        return value;
                    }
                }
            }
            Value::Object(decode_fields(map))
        }
    }
}

fn decode_fields(map: &BTreeMap<String, SqlData>) -> BTreeMap<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), decode(value)))
        .collect()
}

fn decode_tag(key: &str, payload: &SqlData) -> Option<Value> {
    if key == OBJECT {
        return match payload {
            SqlData::Object(inner) => Some(Value::Object(decode_fields(inner))),
            _ => None,
        };
    }

    let text = match payload {
        SqlData::String(s) => s.as_str(),
        _ => return None,
    };
    match key {
        SIGNED => text.parse::<i64>().ok().map(Value::from),
        UNSIGNED => text.parse::<u64>().ok().map(Value::from),
        DECIMAL => BigDecimal::from_str(text).ok().map(Value::from),
        BINARY => STANDARD.decode(text).ok().map(Value::Binary),
        DATE => text
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(Value::Timestamp),
        CALENDAR => text
            .parse::<NaiveDate>()
            .map(Value::Date)
            .or_else(|_| text.parse::<NaiveTime>().map(Value::Time))
            .ok(),
        _ => None,
    }
}
