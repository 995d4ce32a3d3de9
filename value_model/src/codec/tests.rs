use super::{document, json, sql, tagged};
use crate::types::SqlData;
use crate::value::{Number, Value};
use crate::fields;
use bigdecimal::BigDecimal;
use bson::spec::BinarySubtype;
use bson::{doc, Bson};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::json;
use std::str::FromStr;

fn decimal(text: &str) -> Value {
    Value::from(BigDecimal::from_str(text).unwrap())
}

fn sample_values() -> Vec<Value> {
    vec![
        Value::Null,
        Value::from(true),
        Value::from("hello"),
        Value::from(i64::MIN),
        Value::from(i64::MAX),
        Value::from(u64::MAX),
        Value::from(42u64),
        Value::from(1.5),
        decimal("12345678901234567890.123456789"),
        decimal("-0.000001"),
        Value::from(DateTime::from_timestamp_millis(1_700_000_000_123).unwrap()),
        Value::from(NaiveDate::from_ymd_opt(1969, 7, 20).unwrap()),
        Value::from(NaiveTime::from_hms_milli_opt(8, 30, 15, 250).unwrap()),
        Value::binary(vec![0u8, 1, 2, 254, 255]),
        Value::from(vec![Value::from(1), Value::from("two"), Value::Null]),
        Value::from(fields! {
            "nested" => fields! { "deep" => vec![Value::from(u64::MAX)] },
            "$signed" => "not a tag",
            "plain" => 3,
        }),
        Value::from(fields! { "$signed" => "hello" }),
        Value::from(fields! { "$object" => fields! { "a" => 1 } }),
    ]
}

// ========================================
// Document codec
// ========================================

/// Equality that also requires matching number variants
fn same_shape(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            std::mem::discriminant(x) == std::mem::discriminant(y) && x == y
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_shape(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((kx, vx), (ky, vy))| kx == ky && same_shape(vx, vy))
        }
        _ => a == b,
    }
}

/// What the document codec hands back: BSON has no unsigned integers
fn after_document(value: &Value) -> Value {
    match value {
        Value::Number(Number::Unsigned(n)) => match i64::try_from(*n) {
            Ok(n) => Value::Number(Number::Signed(n)),
            Err(_) => Value::Number(Number::Decimal(BigDecimal::from(*n))),
        },
        Value::Array(items) => Value::Array(items.iter().map(after_document).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), after_document(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[test]
fn test_document_round_trip() {
    for value in sample_values() {
        let encoded = document::encode(&value).unwrap();
        let decoded = document::decode(&encoded).unwrap();
        let expected = after_document(&value);
        assert!(
            same_shape(&decoded, &expected),
            "{:?} decoded as {:?}",
            value,
            decoded
        );
    }
}

#[test]
fn test_document_unsigned_comes_back_signed_or_decimal() {
    let small = document::decode(&document::encode(&Value::from(42u64)).unwrap()).unwrap();
    assert!(matches!(small, Value::Number(Number::Signed(42))));

    let large = document::decode(&document::encode(&Value::from(u64::MAX)).unwrap()).unwrap();
    assert!(matches!(large, Value::Number(Number::Decimal(_))));
    assert_eq!(large.as_number().and_then(Number::as_u64), Some(u64::MAX));
}

#[test]
fn test_document_integer_mapping() {
    assert_eq!(document::encode(&Value::from(7)).unwrap(), Bson::Int64(7));
    assert_eq!(
        document::encode(&Value::from(7u64)).unwrap(),
        Bson::Int64(7)
    );
    assert!(matches!(
        document::encode(&Value::from(u64::MAX)).unwrap(),
        Bson::Decimal128(_)
    ));
    assert_eq!(
        document::decode(&Bson::Int32(-3)).unwrap(),
        Value::Number(Number::Signed(-3))
    );
}

#[test]
fn test_document_dates_use_calendar_binary() {
    let date = Value::from(NaiveDate::from_ymd_opt(2020, 5, 17).unwrap());
    match document::encode(&date).unwrap() {
        Bson::Binary(binary) => {
            assert_eq!(
                binary.subtype,
                BinarySubtype::UserDefined(document::CALENDAR_SUBTYPE)
            );
        }
        other => panic!("unexpected encoding {:?}", other),
    }
}

#[test]
fn test_document_unsupported_types() {
    let regex = Bson::RegularExpression(bson::Regex {
        pattern: "^a".to_string(),
        options: String::new(),
    });
    assert!(document::decode(&regex).is_err());
    assert!(document::decode(&Bson::JavaScriptCode("1".to_string())).is_err());
    assert!(document::decode(&Bson::MaxKey).is_err());
}

#[test]
fn test_document_object_id_decodes_to_hex() {
    let oid = bson::oid::ObjectId::new();
    assert_eq!(
        document::decode(&Bson::ObjectId(oid)).unwrap(),
        Value::String(oid.to_hex())
    );
}

#[test]
fn test_document_decimal_out_of_range() {
    let huge = decimal("1e7000");
    assert!(document::encode(&huge).is_err());
}

#[test]
fn test_decode_document_keeps_keys() {
    let doc = doc! { "_id": "x", "age": 10_i64 };
    let entries = document::decode_document(&doc).unwrap();
    assert_eq!(
        entries,
        vec![
            ("_id".to_string(), Value::from("x")),
            ("age".to_string(), Value::from(10)),
        ]
    );
}

// ========================================
// Tagged codec
// ========================================

#[test]
fn test_tagged_round_trip() {
    for value in sample_values() {
        let encoded = tagged::encode(&value);
        assert_eq!(tagged::decode(&encoded), value);

        // Through JSON, as stored in a JSONB column
        let through_json = SqlData::from_json(&encoded.to_json());
        assert_eq!(tagged::decode(&through_json), value);
    }
}

#[test]
fn test_tagged_shapes() {
    assert_eq!(
        tagged::encode(&Value::from(-5)).to_json(),
        json!({"$signed": "-5"})
    );
    assert_eq!(
        tagged::encode(&Value::from(u64::MAX)).to_json(),
        json!({"$unsigned": "18446744073709551615"})
    );
    assert_eq!(
        tagged::encode(&decimal("1.25")).to_json(),
        json!({"$decimal": "1.25"})
    );
    assert_eq!(
        tagged::encode(&Value::binary(b"hi".to_vec())).to_json(),
        json!({"$binary": "aGk="})
    );
    assert_eq!(
        tagged::encode(&Value::from(DateTime::from_timestamp_millis(1500).unwrap())).to_json(),
        json!({"$date": "1500"})
    );
    assert_eq!(
        tagged::encode(&Value::from(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap())).to_json(),
        json!({"$calendar": "2021-03-04"})
    );
    assert_eq!(tagged::encode(&Value::from(0.5)).to_json(), json!(0.5));
}

#[test]
fn test_tagged_reserved_key_escaping() {
    let value = Value::from(fields! { "$signed" => "hello" });
    let encoded = tagged::encode(&value).to_json();
    assert_eq!(encoded, json!({"$object": {"$signed": "hello"}}));
    assert_eq!(tagged::decode(&SqlData::from_json(&encoded)), value);
}

#[test]
fn test_tagged_multi_key_objects_are_not_escaped() {
    let value = Value::from(fields! { "$signed" => "1", "other" => true });
    let encoded = tagged::encode(&value).to_json();
    assert_eq!(encoded, json!({"$signed": "1", "other": true}));
}

#[test]
fn test_tagged_malformed_payload_falls_back_to_object() {
    let malformed = SqlData::from_json(&json!({"$signed": "not a number"}));
    assert_eq!(
        tagged::decode(&malformed),
        Value::from(fields! { "$signed" => "not a number" })
    );

    let wrong_shape = SqlData::from_json(&json!({"$binary": 12}));
    assert_eq!(
        tagged::decode(&wrong_shape),
        Value::from(fields! { "$binary" => 12 })
    );
}

// ========================================
// Strict relational codec
// ========================================

#[test]
fn test_sql_top_level_values_are_untagged() {
    assert_eq!(sql::encode(&Value::from(5)), SqlData::Number(Number::Signed(5)));
    assert_eq!(
        sql::encode(&Value::from(u64::MAX)),
        SqlData::Number(Number::Unsigned(u64::MAX))
    );
    let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    assert_eq!(sql::encode(&Value::from(date)), SqlData::Date(date));
}

#[test]
fn test_sql_children_are_tagged() {
    let value = Value::from(fields! { "count" => 2, "tags" => vec![Value::from("a")] });
    assert_eq!(
        sql::encode(&value).to_json(),
        json!({"count": {"$signed": "2"}, "tags": ["a"]})
    );
}

#[test]
fn test_sql_round_trip() {
    for value in sample_values() {
        let encoded = sql::encode(&value);
        let through_json = match &encoded {
            SqlData::Array(_) | SqlData::Object(_) => SqlData::from_json(&encoded.to_json()),
            _ => encoded.clone(),
        };
        assert_eq!(sql::decode(&through_json), value);
    }
}

#[test]
fn test_sql_unsigned_read_back_as_decimal_is_equal() {
    let stored = SqlData::Number(Number::Decimal(
        BigDecimal::from_str("18446744073709551615").unwrap(),
    ));
    assert_eq!(sql::decode(&stored), Value::from(u64::MAX));
}

// ========================================
// Interchange codec
// ========================================

#[test]
fn test_json_integers_stay_integral() {
    assert_eq!(json::decode(&json!(10)), Value::Number(Number::Signed(10)));
    assert_eq!(
        json::decode(&json!(u64::MAX)),
        Value::Number(Number::Unsigned(u64::MAX))
    );
    assert_eq!(json::decode(&json!(2.5)), Value::Number(Number::Float(2.5)));
}

#[test]
fn test_json_encoding() {
    let value = Value::from(fields! {
        "when" => DateTime::from_timestamp_millis(0).unwrap(),
        "blob" => Value::binary(b"hi".to_vec()),
        "amount" => decimal("42"),
        "ratio" => decimal("0.5"),
        "nan" => f64::NAN,
    });
    assert_eq!(
        json::encode(&value),
        json!({
            "when": "1970-01-01T00:00:00.000Z",
            "blob": "aGk=",
            "amount": 42,
            "ratio": 0.5,
            "nan": null
        })
    );
}

#[test]
fn test_value_serializes_through_json_codec() {
    let value = Value::from(fields! { "age" => 10 });
    assert_eq!(serde_json::to_value(&value).unwrap(), json!({"age": 10}));
}
