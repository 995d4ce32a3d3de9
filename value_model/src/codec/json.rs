//! Interchange codec
//!
//! Converts to and from plain JSON. Exact numbers that JSON cannot hold are
//! approximated, so this is not a round-trip codec for extreme magnitudes.

use crate::value::{Number, Value};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::SecondsFormat;
use serde_json::Value as Json;

pub fn encode(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::String(s) => Json::String(s.clone()),
        Value::Number(n) => encode_number(n),
        Value::Timestamp(t) => Json::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::Date(d) => Json::String(d.to_string()),
        Value::Time(t) => Json::String(t.to_string()),
        Value::Binary(bytes) => Json::String(STANDARD.encode(bytes)),
        Value::Array(items) => Json::Array(items.iter().map(encode).collect()),
        Value::Object(map) => Json::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), encode(value)))
                .collect(),
        ),
    }
}

fn float(n: f64) -> Json {
    serde_json::Number::from_f64(n)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

fn encode_number(number: &Number) -> Json {
    match number {
        Number::Signed(n) => Json::from(*n),
        Number::Unsigned(n) => Json::from(*n),
        Number::Float(n) => float(*n),
        Number::Decimal(d) => {
            if d.is_integer() {
                if let Some(n) = number.as_i64() {
                    return Json::from(n);
                }
                if let Some(n) = number.as_u64() {
                    return Json::from(n);
                }
            }
            number.as_f64().map(float).unwrap_or(Json::Null)
        }
    }
}

pub fn decode(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::String(s) => Value::String(s.clone()),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(Number::Signed(i))
            } else if let Some(u) = n.as_u64() {
                Value::Number(Number::Unsigned(u))
            } else {
                Value::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Json::Array(items) => Value::Array(items.iter().map(decode).collect()),
        Json::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), decode(value)))
                .collect(),
        ),
    }
}
