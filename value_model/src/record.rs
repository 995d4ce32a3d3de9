//! Records returned to applications
//!
//! A [`Record`] is assembled from the raw entries of a row or document. The system
//! managed columns are lifted out of the entries, so `fields` only ever carries user
//! data.

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const ID_FIELD: &str = "id";
pub const DOCUMENT_ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";

pub const RESERVED_FIELDS: [&str; 4] = [
    ID_FIELD,
    DOCUMENT_ID_FIELD,
    CREATED_AT_FIELD,
    UPDATED_AT_FIELD,
];

pub type Fields = BTreeMap<String, Value>;

pub fn is_reserved(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

/// What to do with null entries while materializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Documents only contain fields that were written, so a null is a real value
    Keep,
    /// Relational rows carry every column, NULL meaning "not set"
    Skip,
}

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub class: String,
    pub id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fields: Fields,
}

impl Record {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            id: None,
            created_at: None,
            updated_at: None,
            fields: Fields::new(),
        }
    }

    pub fn materialize<I>(class: &str, entries: I, nulls: NullPolicy) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut record = Record::new(class);

        for (key, value) in entries {
            match key.as_str() {
                ID_FIELD | DOCUMENT_ID_FIELD => record.id = id_text(value),
                CREATED_AT_FIELD => record.created_at = value.as_timestamp(),
                UPDATED_AT_FIELD => record.updated_at = value.as_timestamp(),
                _ if value.is_null() && nulls == NullPolicy::Skip => {}
                _ => {
                    record.fields.insert(key, value);
                }
            }
        }

        record
    }

    /// Field value, [`Value::Null`] when absent
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl std::ops::Index<&str> for Record {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        self.get(field)
    }
}

fn id_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        other => Some(crate::codec::json::encode(&other).to_string()),
    }
}
