//! MongoDB compilation
//!
//! Filters, updates, sort and projection become BSON documents. Operands are encoded
//! with the document codec; the `id` field maps to `_id`.

use crate::errors::CompileError;
use crate::ordering::SortOrder;
use crate::predicate::{Condition, LogicalOperator, Predicate, QueryOperator};
use crate::projection::Projection;
use crate::update::{UpdateKind, UpdateOperation, UpdateSet};
use bson::{doc, Bson, Document};
use value_model::codec::document as codec;
use value_model::record::{DOCUMENT_ID_FIELD, ID_FIELD};
use value_model::{Number, Value};

/// Document field name for a predicate or update field
pub fn document_field(field: &str) -> &str {
    if field == ID_FIELD {
        DOCUMENT_ID_FIELD
    } else {
        field
    }
}

/// Empty document (match all) when there is no predicate
pub fn compile_filter(predicate: Option<&Predicate>) -> Result<Document, CompileError> {
    match predicate {
        None => Ok(Document::new()),
        Some(predicate) => compile_predicate(predicate),
    }
}

pub fn compile_predicate(predicate: &Predicate) -> Result<Document, CompileError> {
    match predicate {
        Predicate::Condition(condition) => compile_condition(condition),
        Predicate::Group { operator, filters } => match (operator, filters.as_slice()) {
            (LogicalOperator::And, []) => Ok(Document::new()),
            // Every document has an `_id`, so this matches nothing
            (LogicalOperator::Or, []) => Ok(single_key(
                DOCUMENT_ID_FIELD,
                Bson::Document(doc! { "$exists": false }),
            )),
            (_, [single]) => compile_predicate(single),
            (operator, filters) => {
                let key = match operator {
                    LogicalOperator::And => "$and",
                    LogicalOperator::Or => "$or",
                };
                let compiled = filters
                    .iter()
                    .map(|f| compile_predicate(f).map(Bson::Document))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(single_key(key, Bson::Array(compiled)))
            }
        },
        Predicate::Not(inner) => {
            let negated = compile_predicate(inner)?;
            Ok(doc! { "$nor": [negated] })
        }
    }
}

fn compile_condition(condition: &Condition) -> Result<Document, CompileError> {
    let field = document_field(&condition.field);
    let value = &condition.value;

    let criteria = match condition.operator {
        QueryOperator::Eq if value.is_null() => Bson::Null,
        QueryOperator::Eq => single_key("$eq", codec::encode(value)?).into(),
        QueryOperator::Ne => single_key("$ne", codec::encode(value)?).into(),
        QueryOperator::Gt => single_key("$gt", codec::encode(value)?).into(),
        QueryOperator::Gte => single_key("$gte", codec::encode(value)?).into(),
        QueryOperator::Lt => single_key("$lt", codec::encode(value)?).into(),
        QueryOperator::Lte => single_key("$lte", codec::encode(value)?).into(),
        QueryOperator::In => {
            if value.as_array().is_none() {
                return Err(CompileError::invalid_operand(
                    &condition.field,
                    "`in` expects an array",
                ));
            }
            single_key("$in", codec::encode(value)?).into()
        }
        QueryOperator::Exists => match value.as_bool() {
            Some(exists) => Bson::Document(doc! { "$exists": exists }),
            None => {
                return Err(CompileError::invalid_operand(
                    &condition.field,
                    "`exists` expects a boolean",
                ))
            }
        },
    };

    Ok(single_key(field, criteria))
}

fn single_key(key: &str, value: Bson) -> Document {
    let mut document = Document::new();
    document.insert(key, value);
    document
}

fn kind_operator(kind: UpdateKind) -> &'static str {
    match kind {
        UpdateKind::Set => "$set",
        UpdateKind::Unset => "$unset",
        UpdateKind::Increment => "$inc",
        UpdateKind::Multiply => "$mul",
        UpdateKind::Max => "$max",
        UpdateKind::Min => "$min",
        UpdateKind::Push => "$push",
        UpdateKind::RemoveAll => "$pullAll",
        UpdateKind::Pop => "$pop",
    }
}

fn number(n: &Number) -> Result<Bson, CompileError> {
    Ok(codec::encode(&Value::Number(n.clone()))?)
}

/// One operator document per kind present in the update
pub fn compile_update(update: &UpdateSet) -> Result<Document, CompileError> {
    let mut compiled = Document::new();

    for (kind, operations) in update.group_by_kind() {
        let mut fields = Document::new();

        for (field, operation) in operations {
            let operand = match operation {
                UpdateOperation::Set(Value::Null) => Bson::String(String::new()),
                UpdateOperation::Set(value)
                | UpdateOperation::Max(value)
                | UpdateOperation::Min(value)
                | UpdateOperation::Push(value) => codec::encode(value)?,
                UpdateOperation::Increment(n) | UpdateOperation::Multiply(n) => number(n)?,
                UpdateOperation::RemoveAll(value) => {
                    if value.as_array().is_none() {
                        return Err(CompileError::invalid_operand(
                            field,
                            "`remove_all` expects an array",
                        ));
                    }
                    codec::encode(value)?
                }
                UpdateOperation::PopFirst => Bson::Int32(-1),
                UpdateOperation::PopLast => Bson::Int32(1),
            };
            fields.insert(document_field(field), operand);
        }

        compiled.insert(kind_operator(kind), fields);
    }

    Ok(compiled)
}

pub fn compile_sort(order_by: &[(String, SortOrder)]) -> Document {
    let mut sort = Document::new();
    for (field, order) in order_by {
        sort.insert(document_field(field), order.to_bson());
    }
    sort
}

/// `None` returns whole documents
pub fn compile_projection(projection: &Projection) -> Option<Document> {
    projection.document_fields().map(|fields| {
        let mut compiled = Document::new();
        for field in fields {
            compiled.insert(field, 1);
        }
        compiled
    })
}
