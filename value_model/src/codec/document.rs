//! BSON codec for the document backend
//!
//! BSON has no unsigned integer type. `Unsigned` values up to `i64::MAX` are stored
//! as `Int64` and decode as `Signed`; larger ones are stored as `Decimal128` and
//! decode as `Decimal`. The numeric value is kept exactly, the variant is not.
//! `Date` and `Time` travel as calendar components in a user-defined binary
//! subtype.

use crate::calendar::DateComponents;
use crate::errors::CodecError;
use crate::value::{Number, Value};
use bigdecimal::BigDecimal;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Decimal128, Document};
use std::str::FromStr;

/// Binary subtype holding [`DateComponents`]
pub const CALENDAR_SUBTYPE: u8 = 0x80;

pub fn encode(value: &Value) -> Result<Bson, CodecError> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Boolean(b) => Bson::Boolean(*b),
        Value::String(s) => Bson::String(s.clone()),
        Value::Number(number) => encode_number(number)?,
        Value::Timestamp(t) => Bson::DateTime(bson::DateTime::from_chrono(*t)),
        Value::Date(date) => calendar(DateComponents::from_date(*date)),
        Value::Time(time) => calendar(DateComponents::from_time(*time)),
        Value::Binary(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: bytes.clone(),
        }),
        Value::Array(items) => Bson::Array(items.iter().map(encode).collect::<Result<_, _>>()?),
        Value::Object(map) => Bson::Document(encode_document(map)?),
    })
}

pub fn encode_document<'a, I>(entries: I) -> Result<Document, CodecError>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut doc = Document::new();
    for (key, value) in entries {
        doc.insert(key.clone(), encode(value)?);
    }
    Ok(doc)
}

fn encode_number(number: &Number) -> Result<Bson, CodecError> {
    match number {
        Number::Signed(n) => Ok(Bson::Int64(*n)),
        Number::Unsigned(n) => match i64::try_from(*n) {
            Ok(n) => Ok(Bson::Int64(n)),
            Err(_) => decimal128(&n.to_string()),
        },
        Number::Float(n) => Ok(Bson::Double(*n)),
        Number::Decimal(d) => decimal128(&d.to_string()),
    }
}

fn decimal128(text: &str) -> Result<Bson, CodecError> {
    Decimal128::from_str(text)
        .map(Bson::Decimal128)
        .map_err(|_| CodecError::unsupported(format!("decimal {} outside Decimal128 range", text)))
}

fn calendar(components: DateComponents) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::UserDefined(CALENDAR_SUBTYPE),
        bytes: components.to_bytes().to_vec(),
    })
}

pub fn decode(bson: &Bson) -> Result<Value, CodecError> {
    match bson {
        Bson::Null | Bson::Undefined => Ok(Value::Null),
        Bson::Boolean(b) => Ok(Value::Boolean(*b)),
        Bson::String(s) => Ok(Value::String(s.clone())),
        Bson::Int32(n) => Ok(Value::Number(Number::Signed(i64::from(*n)))),
        Bson::Int64(n) => Ok(Value::Number(Number::Signed(*n))),
        Bson::Double(n) => Ok(Value::Number(Number::Float(*n))),
        Bson::Decimal128(d) => {
            let text = d.to_string();
            BigDecimal::from_str(&text)
                .map(|d| Value::Number(Number::Decimal(d)))
                .map_err(|_| CodecError::unsupported(format!("decimal128 {}", text)))
        }
        Bson::DateTime(t) => Ok(Value::Timestamp(t.to_chrono())),
        Bson::Binary(binary) => match binary.subtype {
            BinarySubtype::UserDefined(CALENDAR_SUBTYPE) => {
                DateComponents::from_bytes(&binary.bytes)?.into_value()
            }
            _ => Ok(Value::Binary(binary.bytes.clone())),
        },
        Bson::ObjectId(oid) => Ok(Value::String(oid.to_hex())),
        Bson::Array(items) => Ok(Value::Array(
            items.iter().map(decode).collect::<Result<_, _>>()?,
        )),
        Bson::Document(doc) => Ok(Value::Object(
            doc.iter()
                .map(|(key, value)| Ok((key.clone(), decode(value)?)))
                .collect::<Result<_, CodecError>>()?,
        )),
        other => Err(CodecError::unsupported(format!("bson {:?}", other.element_type()))),
    }
}

/// Decode every entry of a document, keeping the keys
pub fn decode_document(doc: &Document) -> Result<Vec<(String, Value)>, CodecError> {
    doc.iter()
        .map(|(key, value)| Ok((key.clone(), decode(value)?)))
        .collect()
}
