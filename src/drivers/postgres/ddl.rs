//! Schema statements

use super::statements::table_name;
use crate::errors::PolyError;
use crate::schema::{Column, Table, TableIndex};
use query_expr::{SqlGenerator, ValidatedFieldName};
use value_model::record::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

pub(crate) const TABLES_SQL: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' ORDER BY table_name";

fn column_definition(column: &Column) -> Result<String, PolyError> {
    Ok(format!(
        "{} {}",
        SqlGenerator::column(&column.name)?,
        column.column_type.to_pg_type()
    ))
}

pub(crate) fn create_table_sql(table: &Table) -> Result<String, PolyError> {
    let mut definitions = vec![
        format!("{} TEXT PRIMARY KEY", SqlGenerator::column(ID_FIELD)?),
        format!("{} TIMESTAMPTZ", SqlGenerator::column(CREATED_AT_FIELD)?),
        format!("{} TIMESTAMPTZ", SqlGenerator::column(UPDATED_AT_FIELD)?),
    ];
    for column in table.user_columns() {
        definitions.push(column_definition(column)?);
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table_name(&table.name)?,
        definitions.join(", ")
    ))
}

/// `None` when there is nothing to add
pub(crate) fn add_columns_sql(class: &str, columns: &[Column]) -> Result<Option<String>, PolyError> {
    let additions = columns
        .iter()
        .filter(|column| !value_model::record::is_reserved(&column.name))
        .map(|column| column_definition(column).map(|def| format!("ADD COLUMN IF NOT EXISTS {}", def)))
        .collect::<Result<Vec<_>, _>>()?;

    if additions.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!(
        "ALTER TABLE {} {}",
        table_name(class)?,
        additions.join(", ")
    )))
}

pub(crate) fn drop_table_sql(class: &str) -> Result<String, PolyError> {
    Ok(format!("DROP TABLE IF EXISTS {}", table_name(class)?))
}

pub(crate) fn drop_columns_sql(class: &str, columns: &[String]) -> Result<Option<String>, PolyError> {
    let drops = columns
        .iter()
        .map(|column| SqlGenerator::column(column).map(|c| format!("DROP COLUMN IF EXISTS {}", c)))
        .collect::<Result<Vec<_>, _>>()?;

    if drops.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!(
        "ALTER TABLE {} {}",
        table_name(class)?,
        drops.join(", ")
    )))
}

pub(crate) fn create_index_sql(class: &str, index: &TableIndex) -> Result<String, PolyError> {
    if index.columns.is_empty() {
        return Err(PolyError::InvalidOperand {
            field: index.name.clone(),
            reason: "index has no columns".to_string(),
        });
    }

    let columns = index
        .columns
        .iter()
        .map(|(column, order)| {
            SqlGenerator::column(column).map(|c| format!("{} {}", c, order.to_sql()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if index.is_unique { "UNIQUE " } else { "" },
        ValidatedFieldName::new(&index.name)?.quoted(),
        table_name(class)?,
        columns.join(", ")
    ))
}

pub(crate) fn drop_index_sql(index: &str) -> Result<String, PolyError> {
    Ok(format!(
        "DROP INDEX IF EXISTS {}",
        ValidatedFieldName::new(index)?.quoted()
    ))
}
