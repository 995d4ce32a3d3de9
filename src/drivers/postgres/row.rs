//! Row decoding
//!
//! Columns are decoded by their PostgreSQL type name; JSONB columns go back through
//! the strict codec so nested tagged values are restored.

use crate::errors::PolyError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column as _, Row, TypeInfo};
use value_model::codec::sql;
use value_model::{NullPolicy, Record, SqlData, Value};

pub(crate) fn row_to_record(class: &str, row: &PgRow) -> Result<Record, PolyError> {
    let entries = row
        .columns()
        .iter()
        .map(|column| Ok((column.name().to_string(), decode_column(row, column)?)))
        .collect::<Result<Vec<_>, PolyError>>()?;

    Ok(Record::materialize(class, entries, NullPolicy::Skip))
}

fn decode_column(row: &PgRow, column: &PgColumn) -> Result<Value, PolyError> {
    let index = column.ordinal();

    let value = match column.type_info().name() {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Boolean),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|n| Value::from(i64::from(n))),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|n| Value::from(f64::from(n))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::from),
        "NUMERIC" => row.try_get::<Option<BigDecimal>, _>(index)?.map(Value::from),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.map(Value::String)
        }
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(Value::from),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|t| Value::from(t.and_utc())),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(index)?.map(Value::Date),
        "TIME" => row.try_get::<Option<NaiveTime>, _>(index)?.map(Value::Time),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index)?.map(Value::Binary),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(|json| sql::decode(&SqlData::from_json(&json))),
        other => {
            return Err(PolyError::UnsupportedType(format!(
                "column '{}' has type {}",
                column.name(),
                other
            )));
        }
    };

    Ok(value.unwrap_or(Value::Null))
}
