//! Canonical value definitions
//!
//! [`Value`] is the closed set of types every record field and query operand is
//! expressed in, independently of the backend that stores it.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveTime, SubsecRound, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Numeric payload of [`Value::Number`]
#[derive(Debug, Clone)]
pub enum Number {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    /// Arbitrary precision, never approximated as a float
    Decimal(BigDecimal),
}

impl Number {
    /// True for the variants with an exact decimal value (everything except `Float`)
    pub fn is_exact(&self) -> bool {
        !matches!(self, Number::Float(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Signed(n) => Some(*n),
            Number::Unsigned(n) => i64::try_from(*n).ok(),
            Number::Float(_) => None,
            Number::Decimal(d) if d.is_integer() => d.to_i64(),
            Number::Decimal(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Number::Signed(n) => u64::try_from(*n).ok(),
            Number::Unsigned(n) => Some(*n),
            Number::Float(_) => None,
            Number::Decimal(d) if d.is_integer() => d.to_u64(),
            Number::Decimal(_) => None,
        }
    }

    /// Lossy conversion to a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Number::Signed(n) => Some(*n as f64),
            Number::Unsigned(n) => Some(*n as f64),
            Number::Float(n) => Some(*n),
            Number::Decimal(d) => d.to_f64(),
        }
    }

    /// Exact decimal value, `None` for floats
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Number::Signed(n) => Some(BigDecimal::from(*n)),
            Number::Unsigned(n) => Some(BigDecimal::from(*n)),
            Number::Float(_) => None,
            Number::Decimal(d) => Some(d.clone()),
        }
    }

    /// Zero of the same numeric kind
    pub fn zero_like(&self) -> Number {
        match self {
            Number::Signed(_) => Number::Signed(0),
            Number::Unsigned(_) => Number::Unsigned(0),
            Number::Float(_) => Number::Float(0.0),
            Number::Decimal(_) => Number::Decimal(BigDecimal::from(0)),
        }
    }

    /// Sum. Integers stay 64-bit while they fit, exact values stay exact, and a
    /// float operand makes the result a float.
    pub fn plus(&self, other: &Number) -> Number {
        self.combine(other, i64::checked_add, |a, b| a + b, |a, b| a + b)
    }

    /// Product, with the same promotion rules as [`Number::plus`]
    pub fn times(&self, other: &Number) -> Number {
        self.combine(other, i64::checked_mul, |a, b| a * b, |a, b| a * b)
    }

    fn integer(&self) -> Option<i64> {
        match self {
            Number::Signed(n) => Some(*n),
            Number::Unsigned(n) => i64::try_from(*n).ok(),
            Number::Float(_) | Number::Decimal(_) => None,
        }
    }

    fn combine(
        &self,
        other: &Number,
        integer: fn(i64, i64) -> Option<i64>,
        exact: fn(BigDecimal, BigDecimal) -> BigDecimal,
        float: fn(f64, f64) -> f64,
    ) -> Number {
        if let Some(n) = self
            .integer()
            .zip(other.integer())
            .and_then(|(a, b)| integer(a, b))
        {
            return Number::Signed(n);
        }
        match (self.to_decimal(), other.to_decimal()) {
            (Some(a), Some(b)) => Number::Decimal(exact(a, b)),
            _ => Number::Float(float(
                self.as_f64().unwrap_or(f64::NAN),
                other.as_f64().unwrap_or(f64::NAN),
            )),
        }
    }
}

// Exact numbers compare by value across variants, so a u64 stored by a backend as
// a decimal is still equal to itself after the round trip.
impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Float(a), Number::Float(b)) => a == b,
            (Number::Float(_), _) | (_, Number::Float(_)) => false,
            (Number::Signed(a), Number::Signed(b)) => a == b,
            (Number::Unsigned(a), Number::Unsigned(b)) => a == b,
            (Number::Signed(a), Number::Unsigned(b)) | (Number::Unsigned(b), Number::Signed(a)) => {
                i128::from(*a) == i128::from(*b)
            }
            _ => self.to_decimal() == other.to_decimal(),
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Signed(n) => write!(f, "{}", n),
            Number::Unsigned(n) => write!(f, "{}", n),
            Number::Float(n) => write!(f, "{}", n),
            Number::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl From<i32> for Number {
    fn from(val: i32) -> Self {
        Number::Signed(i64::from(val))
    }
}

impl From<i64> for Number {
    fn from(val: i64) -> Self {
        Number::Signed(val)
    }
}

impl From<u32> for Number {
    fn from(val: u32) -> Self {
        Number::Unsigned(u64::from(val))
    }
}

impl From<u64> for Number {
    fn from(val: u64) -> Self {
        Number::Unsigned(val)
    }
}

impl From<f64> for Number {
    fn from(val: f64) -> Self {
        Number::Float(val)
    }
}

impl From<BigDecimal> for Number {
    fn from(val: BigDecimal) -> Self {
        Number::Decimal(val)
    }
}

/// Backend-neutral value of a record field or query operand
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    String(String),
    Number(Number),
    /// Instant with millisecond precision
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Binary(Vec<u8>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(bytes.into())
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Number(Number::Signed(_)) => "signed",
            Value::Number(Number::Unsigned(_)) => "unsigned",
            Value::Number(Number::Float(_)) => "float",
            Value::Number(Number::Decimal(_)) => "decimal",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Binary(_) => "binary",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().and_then(Number::as_f64)
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::codec::json::encode(self).serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Boolean(val)
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::String(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_string())
    }
}

impl From<Number> for Value {
    fn from(val: Number) -> Self {
        Value::Number(val)
    }
}

impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::Number(val.into())
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::Number(val.into())
    }
}

impl From<u32> for Value {
    fn from(val: u32) -> Self {
        Value::Number(val.into())
    }
}

impl From<u64> for Value {
    fn from(val: u64) -> Self {
        Value::Number(val.into())
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Number(val.into())
    }
}

impl From<BigDecimal> for Value {
    fn from(val: BigDecimal) -> Self {
        Value::Number(val.into())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(val: DateTime<Utc>) -> Self {
        Value::Timestamp(val.trunc_subsecs(3))
    }
}

impl From<NaiveDate> for Value {
    fn from(val: NaiveDate) -> Self {
        Value::Date(val)
    }
}

impl From<NaiveTime> for Value {
    fn from(val: NaiveTime) -> Self {
        Value::Time(val)
    }
}

impl From<Vec<Value>> for Value {
    fn from(val: Vec<Value>) -> Self {
        Value::Array(val)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(val: BTreeMap<String, Value>) -> Self {
        Value::Object(val)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn exact_numbers_compare_by_value() {
        assert_eq!(Number::Signed(42), Number::Unsigned(42));
        assert_eq!(
            Number::Unsigned(u64::MAX),
            Number::Decimal(BigDecimal::from_str("18446744073709551615").unwrap())
        );
        assert_eq!(
            Number::Decimal(BigDecimal::from_str("1.50").unwrap()),
            Number::Decimal(BigDecimal::from_str("1.5").unwrap())
        );
        assert_ne!(Number::Signed(-1), Number::Unsigned(u64::MAX));
    }

    #[test]
    fn floats_never_equal_exact_numbers() {
        assert_ne!(Number::Float(1.0), Number::Signed(1));
        assert_ne!(
            Number::Decimal(BigDecimal::from_str("0.5").unwrap()),
            Number::Float(0.5)
        );
        assert_eq!(Number::Float(0.25), Number::Float(0.25));
    }

    #[test]
    fn arithmetic_promotes_operands() {
        assert!(matches!(
            Number::Signed(1).plus(&Number::Signed(5)),
            Number::Signed(6)
        ));
        assert!(matches!(
            Number::Signed(3).times(&Number::Unsigned(2)),
            Number::Signed(6)
        ));
        assert!(matches!(
            Number::Signed(i64::MAX).plus(&Number::Signed(1)),
            Number::Decimal(_)
        ));
        assert_eq!(
            Number::Signed(i64::MAX).plus(&Number::Signed(1)),
            Number::Unsigned(1 << 63)
        );
        assert!(matches!(
            Number::Signed(2).times(&Number::Float(1.5)),
            Number::Float(n) if n == 3.0
        ));
        assert_eq!(
            Number::Decimal(BigDecimal::from_str("0.1").unwrap())
                .plus(&Number::Signed(1)),
            Number::Decimal(BigDecimal::from_str("1.1").unwrap())
        );
    }

    #[test]
    fn timestamps_are_truncated_to_millis() {
        let instant = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let value = Value::from(instant);
        assert_eq!(
            value.as_timestamp().unwrap().timestamp_subsec_nanos(),
            123_000_000
        );
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::from(7).as_i64(), Some(7));
        assert_eq!(Value::from(u64::MAX).as_i64(), None);
        assert_eq!(Value::from("a").as_str(), Some("a"));
        assert_eq!(Value::Null.type_name(), "null");
        assert!(Value::default().is_null());
    }
}
