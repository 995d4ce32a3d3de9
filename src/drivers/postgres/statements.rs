//! SQL for each verb, with the arguments collected while generating it

use crate::driver::Returning;
use crate::errors::PolyError;
use crate::plan::{FindQuery, InsertPlan};
use query_expr::{SqlArgument, SqlGenerator, UpdateSet, ValidatedTableName};
use value_model::Value;
use value_model::record::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

/// Alias of the pre-update row in find-and-modify statements
const OLD_ROW: &str = "\"__old__\"";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub sql: String,
    pub params: Vec<SqlArgument>,
}

impl Statement {
    fn new(clauses: &[&str], generator: SqlGenerator) -> Self {
        Self {
            sql: join_clauses(clauses),
            params: generator.into_params(),
        }
    }
}

fn join_clauses(clauses: &[&str]) -> String {
    clauses
        .iter()
        .filter(|clause| !clause.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn table_name(class: &str) -> Result<String, PolyError> {
    Ok(ValidatedTableName::new(class)?.quoted())
}

pub(crate) fn count(query: &FindQuery) -> Result<Statement, PolyError> {
    let table = table_name(query.class_name()?)?;
    let mut generator = SqlGenerator::new();
    let where_clause = generator.build_where_clause(query.predicate().as_ref())?;

    Ok(Statement::new(
        &["SELECT COUNT(*) FROM", &table, &where_clause],
        generator,
    ))
}

pub(crate) fn select(query: &FindQuery) -> Result<Statement, PolyError> {
    let table = table_name(query.class_name()?)?;
    let mut generator = SqlGenerator::new();
    let columns = SqlGenerator::build_select_clause(&query.projection(), None)?;
    let where_clause = generator.build_where_clause(query.predicate().as_ref())?;
    let order_clause = SqlGenerator::build_order_clause(&query.sort)?;
    let limit_clause = SqlGenerator::build_limit_clause(&query.pagination());

    Ok(Statement::new(
        &[
            "SELECT",
            &columns,
            "FROM",
            &table,
            &where_clause,
            &order_clause,
            &limit_clause,
        ],
        generator,
    ))
}

/// Subquery locking the first match in sort order
fn first_match(
    generator: &mut SqlGenerator,
    query: &FindQuery,
    table: &str,
    columns: &str,
) -> Result<String, PolyError> {
    let where_clause = generator.build_where_clause(query.predicate().as_ref())?;
    let order_clause = SqlGenerator::build_order_clause(&query.sort)?;

    Ok(format!(
        "({})",
        join_clauses(&[
            "SELECT",
            columns,
            "FROM",
            table,
            &where_clause,
            &order_clause,
            "LIMIT 1 FOR UPDATE",
        ])
    ))
}

/// Updates the first match. `RETURNING` reads the new row, or the locked copy of
/// the old one for [`Returning::Before`].
pub(crate) fn update_one(
    query: &FindQuery,
    update: &UpdateSet,
    returning: Returning,
) -> Result<Statement, PolyError> {
    let table = table_name(query.class_name()?)?;
    let mut generator = SqlGenerator::new();
    let assignments = generator.build_set_clause(update, &table)?;
    let matched = first_match(&mut generator, query, &table, "*")?;

    let snapshot = match returning {
        Returning::Before => OLD_ROW,
        Returning::After => table.as_str(),
    };
    let columns = SqlGenerator::build_select_clause(&query.projection(), Some(snapshot))?;
    let id = SqlGenerator::column(ID_FIELD)?;

    Ok(Statement::new(
        &[
            "UPDATE",
            &table,
            "SET",
            &assignments,
            "FROM",
            &matched,
            "AS",
            OLD_ROW,
            &format!("WHERE {table}.{id} = {OLD_ROW}.{id}"),
            "RETURNING",
            &columns,
        ],
        generator,
    ))
}

pub(crate) fn delete_one(query: &FindQuery) -> Result<Statement, PolyError> {
    let table = table_name(query.class_name()?)?;
    let id = SqlGenerator::column(ID_FIELD)?;
    let mut generator = SqlGenerator::new();
    let matched = first_match(&mut generator, query, &table, &id)?;
    let columns = SqlGenerator::build_select_clause(&query.projection(), None)?;

    Ok(Statement::new(
        &[
            "DELETE FROM",
            &table,
            &format!("WHERE {id} IN {matched}"),
            "RETURNING",
            &columns,
        ],
        generator,
    ))
}

pub(crate) fn delete_all(query: &FindQuery) -> Result<Statement, PolyError> {
    let table = table_name(query.class_name()?)?;
    let mut generator = SqlGenerator::new();
    let where_clause = generator.build_where_clause(query.predicate().as_ref())?;

    Ok(Statement::new(&["DELETE FROM", &table, &where_clause], generator))
}

/// NULL means "not set" for a relational row, so null fields are left out
pub(crate) fn insert(class: &str, plan: &InsertPlan) -> Result<Statement, PolyError> {
    let table = table_name(class)?;
    let mut generator = SqlGenerator::new();
    let mut columns = Vec::with_capacity(plan.fields.len() + 3);
    let mut values = Vec::with_capacity(plan.fields.len() + 3);

    let stamp = Value::from(plan.now);
    let system = [
        (ID_FIELD, Value::String(plan.id.clone())),
        (CREATED_AT_FIELD, stamp.clone()),
        (UPDATED_AT_FIELD, stamp),
    ];
    for (field, value) in &system {
        columns.push(SqlGenerator::column(field)?);
        values.push(generator.bind_value(value));
    }

    for (field, value) in plan.fields.iter().filter(|(_, value)| !value.is_null()) {
        columns.push(SqlGenerator::column(field)?);
        values.push(generator.bind_value(value));
    }

    Ok(Statement::new(
        &[
            "INSERT INTO",
            &table,
            &format!("({})", columns.join(", ")),
            "VALUES",
            &format!("({})", values.join(", ")),
            "RETURNING *",
        ],
        generator,
    ))
}
