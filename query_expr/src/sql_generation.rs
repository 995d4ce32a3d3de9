//! PostgreSQL compilation
//!
//! Builds SQL fragments with `$n` placeholders and collects the matching arguments.
//! Top-level columns compare against typed arguments (strict codec); dotted paths
//! reach into JSONB columns and compare against tagged JSON.

use crate::errors::CompileError;
use crate::identifier::{quote_ident, ValidatedFieldName};
use crate::ordering::SortOrder;
use crate::pagination::Pagination;
use crate::predicate::{Condition, LogicalOperator, Predicate, QueryOperator};
use crate::projection::Projection;
use crate::update::{UpdateOperation, UpdateSet};
use value_model::codec::{sql, tagged};
use value_model::record::{DOCUMENT_ID_FIELD, ID_FIELD};
use value_model::{SqlData, Value};

/// Positional argument collected while generating SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArgument {
    /// Bound with the column's native type
    Typed(SqlData),
    /// Bound as JSONB
    Json(serde_json::Value),
}

/// Left-hand side of a comparison
enum FieldExpr {
    Column(String),
    Nested(String),
}

impl FieldExpr {
    fn sql(&self) -> &str {
        match self {
            FieldExpr::Column(sql) | FieldExpr::Nested(sql) => sql,
        }
    }
}

#[derive(Debug, Default)]
pub struct SqlGenerator {
    params: Vec<SqlArgument>,
}

impl SqlGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &[SqlArgument] {
        &self.params
    }

    pub fn into_params(self) -> Vec<SqlArgument> {
        self.params
    }

    /// Register an argument and return its placeholder
    pub fn bind(&mut self, argument: SqlArgument) -> String {
        self.params.push(argument);
        format!("${}", self.params.len())
    }

    /// Placeholder for a value stored in a typed column
    pub fn bind_value(&mut self, value: &Value) -> String {
        self.bind(SqlArgument::Typed(sql::encode(value)))
    }

    /// Placeholder for a value compared or combined as JSONB
    pub fn bind_json(&mut self, value: &Value) -> String {
        let placeholder = self.bind(SqlArgument::Json(tagged::encode(value).to_json()));
        format!("{}::jsonb", placeholder)
    }

    /// Quoted column name for a top-level field; `_id` is the `id` column
    pub fn column(field: &str) -> Result<String, CompileError> {
        if field == DOCUMENT_ID_FIELD {
            return Ok(quote_ident(ID_FIELD));
        }
        Ok(ValidatedFieldName::new(field)?.quoted())
    }

    fn qualified(qualifier: Option<&str>, column: String) -> String {
        match qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, column),
            None => column,
        }
    }

    fn field_expr(field: &str, qualifier: Option<&str>) -> Result<FieldExpr, CompileError> {
        let mut segments = field.split('.');
        let head = segments.next().unwrap_or_default();
        let column = Self::qualified(qualifier, Self::column(head)?);

        let path = segments
            .map(|segment| ValidatedFieldName::new(segment).map(|name| name.as_str().to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        if path.is_empty() {
            Ok(FieldExpr::Column(column))
        } else {
            Ok(FieldExpr::Nested(format!("({} #> '{{{}}}')", column, path.join(","))))
        }
    }

    fn operand(&mut self, field: &FieldExpr, value: &Value) -> String {
        match field {
            FieldExpr::Column(_) => self.bind_value(value),
            FieldExpr::Nested(_) => self.bind_json(value),
        }
    }

    fn is_null_sql(field: &FieldExpr) -> String {
        match field {
            FieldExpr::Column(sql) => format!("{} IS NULL", sql),
            FieldExpr::Nested(sql) => format!("({} IS NULL OR {} = 'null'::jsonb)", sql, sql),
        }
    }

    /// `WHERE ...`, or an empty string when there is nothing to filter on
    pub fn build_where_clause(
        &mut self,
        predicate: Option<&Predicate>,
    ) -> Result<String, CompileError> {
        match predicate {
            None => Ok(String::new()),
            Some(predicate) => Ok(format!("WHERE {}", self.build_condition_sql(predicate)?)),
        }
    }

    pub fn build_condition_sql(&mut self, predicate: &Predicate) -> Result<String, CompileError> {
        match predicate {
            Predicate::Condition(condition) => self.build_single_condition_sql(condition),
            Predicate::Group { operator, filters } => {
                let (operator_str, empty) = match operator {
                    LogicalOperator::And => (" AND ", "1=1"),
                    LogicalOperator::Or => (" OR ", "1=0"),
                };

                match filters.as_slice() {
                    [] => Ok(empty.to_string()),
                    [single] => self.build_condition_sql(single),
                    _ => {
                        let group_conditions = filters
                            .iter()
                            .map(|f| self.build_condition_sql(f))
                            .collect::<Result<Vec<_>, _>>()?
                            .join(operator_str);
                        Ok(format!("({})", group_conditions))
                    }
                }
            }
            // A comparison against NULL is unknown; treat it as false before negating.
            Predicate::Not(inner) => Ok(format!(
                "NOT COALESCE(({}), FALSE)",
                self.build_condition_sql(inner)?
            )),
        }
    }

    fn build_single_condition_sql(&mut self, condition: &Condition) -> Result<String, CompileError> {
        let field = Self::field_expr(&condition.field, None)?;
        let value = &condition.value;

        let sql = match condition.operator {
            QueryOperator::Eq if value.is_null() => Self::is_null_sql(&field),
            QueryOperator::Ne if value.is_null() => format!("NOT {}", Self::is_null_sql(&field)),
            QueryOperator::Eq => {
                let param = self.operand(&field, value);
                format!("{} = {}", field.sql(), param)
            }
            QueryOperator::Ne => {
                let param = self.operand(&field, value);
                format!("{} IS DISTINCT FROM {}", field.sql(), param)
            }
            QueryOperator::Gt | QueryOperator::Gte | QueryOperator::Lt | QueryOperator::Lte => {
                // Null sorts below everything: only the inclusive forms match it
                if value.is_null() {
                    return Ok(match condition.operator {
                        QueryOperator::Gte | QueryOperator::Lte => Self::is_null_sql(&field),
                        _ => "1=0".to_string(),
                    });
                }
                let symbol = match condition.operator {
                    QueryOperator::Gt => ">",
                    QueryOperator::Gte => ">=",
                    QueryOperator::Lt => "<",
                    _ => "<=",
                };
                let param = self.operand(&field, value);
                format!("{} {} {}", field.sql(), symbol, param)
            }
            QueryOperator::In => {
                let items = value.as_array().ok_or_else(|| {
                    CompileError::invalid_operand(&condition.field, "`in` expects an array")
                })?;
                let includes_null = items.iter().any(Value::is_null);
                let placeholders: Vec<String> = items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| self.operand(&field, item))
                    .collect();

                match (placeholders.is_empty(), includes_null) {
                    (true, false) => "1=0".to_string(),
                    (true, true) => Self::is_null_sql(&field),
                    (false, false) => format!("{} IN ({})", field.sql(), placeholders.join(", ")),
                    (false, true) => format!(
                        "({} IN ({}) OR {})",
                        field.sql(),
                        placeholders.join(", "),
                        Self::is_null_sql(&field)
                    ),
                }
            }
            QueryOperator::Exists => match value.as_bool() {
                Some(true) => format!("{} IS NOT NULL", field.sql()),
                Some(false) => format!("{} IS NULL", field.sql()),
                None => {
                    return Err(CompileError::invalid_operand(
                        &condition.field,
                        "`exists` expects a boolean",
                    ))
                }
            },
        };

        Ok(sql)
    }

    /// `SET` list. `qualifier` names the row being updated in expressions that read
    /// the current value.
    pub fn build_set_clause(
        &mut self,
        update: &UpdateSet,
        qualifier: &str,
    ) -> Result<String, CompileError> {
        let mut assignments = Vec::with_capacity(update.len());

        for (field, operation) in &update.operations {
            if field.contains('.') {
                return Err(CompileError::invalid_operand(
                    field,
                    "nested paths cannot be updated in a column",
                ));
            }
            let column = Self::column(field)?;
            let current = format!("{}.{}", qualifier, column);

            let expression = match operation {
                UpdateOperation::Set(Value::Null) => "NULL".to_string(),
                UpdateOperation::Set(value) => self.bind_value(value),
                UpdateOperation::Increment(n) => {
                    let param = self.bind(SqlArgument::Typed(SqlData::Number(n.clone())));
                    format!("COALESCE({}, 0) + {}", current, param)
                }
                UpdateOperation::Multiply(n) => {
                    let param = self.bind(SqlArgument::Typed(SqlData::Number(n.clone())));
                    format!("COALESCE({}, 0) * {}", current, param)
                }
                UpdateOperation::Max(value) => {
                    format!("GREATEST({}, {})", current, self.bind_value(value))
                }
                UpdateOperation::Min(value) => {
                    format!("LEAST({}, {})", current, self.bind_value(value))
                }
                UpdateOperation::Push(value) => format!(
                    "COALESCE({}, '[]'::jsonb) || jsonb_build_array({})",
                    current,
                    self.bind_json(value)
                ),
                UpdateOperation::RemoveAll(value) => {
                    if value.as_array().is_none() {
                        return Err(CompileError::invalid_operand(
                            field,
                            "`remove_all` expects an array",
                        ));
                    }
                    let param = self.bind_json(value);
                    format!(
                        "CASE WHEN {current} IS NULL THEN NULL ELSE (SELECT COALESCE(jsonb_agg(e.value ORDER BY e.ord), '[]'::jsonb) FROM jsonb_array_elements({current}) WITH ORDINALITY AS e(value, ord) WHERE e.value NOT IN (SELECT jsonb_array_elements({param}))) END"
                    )
                }
                UpdateOperation::PopFirst => format!("{} - 0", current),
                UpdateOperation::PopLast => format!("{} - -1", current),
            };

            assignments.push(format!("{} = {}", column, expression));
        }

        Ok(assignments.join(", "))
    }

    /// `ORDER BY ...`, or an empty string
    pub fn build_order_clause(order_by: &[(String, SortOrder)]) -> Result<String, CompileError> {
        if order_by.is_empty() {
            return Ok(String::new());
        }

        let order_items = order_by
            .iter()
            .map(|(field, order)| {
                Self::field_expr(field, None).map(|expr| format!("{} {}", expr.sql(), order.to_sql()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(format!("ORDER BY {}", order_items.join(", ")))
    }

    pub fn build_limit_clause(pagination: &Pagination) -> String {
        pagination.to_sql()
    }

    /// Column list for `SELECT` / `RETURNING`. A dotted include selects its whole
    /// top-level column.
    pub fn build_select_clause(
        projection: &Projection,
        qualifier: Option<&str>,
    ) -> Result<String, CompileError> {
        let columns = match projection.sql_columns() {
            None => return Ok(Self::qualified(qualifier, "*".to_string())),
            Some(columns) => columns,
        };

        let mut seen = Vec::with_capacity(columns.len());
        for field in columns {
            let head = field.split('.').next().unwrap_or(field);
            let column = Self::qualified(qualifier, Self::column(head)?);
            if !seen.contains(&column) {
                seen.push(column);
            }
        }

        Ok(seen.join(", "))
    }
}
