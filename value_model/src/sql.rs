//! Column types for DDL generation

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    /// Exact numbers, including unsigned integers beyond `i64::MAX`
    Decimal,
    Double,
    Boolean,
    Timestamp,
    Date,
    Time,
    Binary,
    /// Arrays and objects
    Json,
}

impl ColumnType {
    pub fn to_pg_type(self) -> &'static str {
        match self {
            ColumnType::String => "TEXT",
            ColumnType::Integer => "BIGINT",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Binary => "BYTEA",
            ColumnType::Json => "JSONB",
        }
    }
}
