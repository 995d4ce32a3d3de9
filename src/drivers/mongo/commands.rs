//! BSON documents and options for each verb

use crate::driver::Returning;
use crate::errors::PolyError;
use crate::plan::{FindQuery, InsertPlan, UpsertPlan};
use crate::schema::TableIndex;
use bson::{Bson, Document};
use mongodb::IndexModel;
use mongodb::options::{
    FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
};
use query_expr::document::{
    compile_filter, compile_projection, compile_sort, compile_update, document_field,
};
use value_model::codec::document as codec;
use value_model::record::{CREATED_AT_FIELD, DOCUMENT_ID_FIELD, UPDATED_AT_FIELD};
use value_model::{NullPolicy, Record, Value};

pub(crate) fn filter(query: &FindQuery) -> Result<Document, PolyError> {
    Ok(compile_filter(query.predicate().as_ref())?)
}

fn sort(query: &FindQuery) -> Option<Document> {
    if query.sort.is_empty() {
        None
    } else {
        Some(compile_sort(&query.sort))
    }
}

pub(crate) fn find_options(query: &FindQuery) -> FindOptions {
    let mut options = FindOptions::default();
    options.sort = sort(query);
    options.skip = query.skip;
    options.limit = query
        .limit
        .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
    options.projection = compile_projection(&query.projection());
    options
}

pub(crate) fn update_options(
    query: &FindQuery,
    returning: Returning,
    upsert: bool,
) -> FindOneAndUpdateOptions {
    let mut options = FindOneAndUpdateOptions::default();
    options.sort = sort(query);
    options.projection = compile_projection(&query.projection());
    options.return_document = Some(match returning {
        Returning::Before => ReturnDocument::Before,
        Returning::After => ReturnDocument::After,
    });
    if upsert {
        options.upsert = Some(true);
    }
    options
}

pub(crate) fn delete_options(query: &FindQuery) -> FindOneAndDeleteOptions {
    let mut options = FindOneAndDeleteOptions::default();
    options.sort = sort(query);
    options.projection = compile_projection(&query.projection());
    options
}

pub(crate) fn insert_document(plan: &InsertPlan) -> Result<Document, PolyError> {
    let stamp = codec::encode(&Value::from(plan.now))?;

    let mut document = Document::new();
    document.insert(DOCUMENT_ID_FIELD, plan.id.clone());
    document.insert(CREATED_AT_FIELD, stamp.clone());
    document.insert(UPDATED_AT_FIELD, stamp);
    for (field, value) in &plan.fields {
        document.insert(document_field(field), codec::encode(value)?);
    }
    Ok(document)
}

/// The update operators plus `$setOnInsert` for the id, creation time and the
/// insert-only fields. Filter equality fields are added by the server itself.
pub(crate) fn upsert_update(plan: &UpsertPlan) -> Result<Document, PolyError> {
    let mut update = compile_update(&plan.update)?;

    let mut on_insert = Document::new();
    on_insert.insert(DOCUMENT_ID_FIELD, plan.insert.id.clone());
    on_insert.insert(CREATED_AT_FIELD, codec::encode(&Value::from(plan.insert.now))?);
    for (field, value) in plan.insert_only_fields() {
        on_insert.insert(document_field(field), codec::encode(value)?);
    }
    update.insert("$setOnInsert", on_insert);

    Ok(update)
}

/// `$unset` of every listed field
pub(crate) fn unset_fields(columns: &[String]) -> Document {
    let mut fields = Document::new();
    for column in columns {
        fields.insert(document_field(column), Bson::String(String::new()));
    }
    let mut update = Document::new();
    update.insert("$unset", fields);
    update
}

pub(crate) fn index_model(index: &TableIndex) -> Result<IndexModel, PolyError> {
    if index.columns.is_empty() {
        return Err(PolyError::InvalidOperand {
            field: index.name.clone(),
            reason: "index has no columns".to_string(),
        });
    }

    let mut keys = Document::new();
    for (column, order) in &index.columns {
        keys.insert(document_field(column), order.to_bson());
    }

    let mut options = IndexOptions::default();
    options.name = Some(index.name.clone());
    if index.is_unique {
        options.unique = Some(true);
    }

    let mut model = IndexModel::default();
    model.keys = keys;
    model.options = Some(options);
    Ok(model)
}

/// Documents only contain written fields, so nulls are kept
pub(crate) fn document_to_record(class: &str, document: &Document) -> Result<Record, PolyError> {
    let entries = codec::decode_document(document)?;
    Ok(Record::materialize(class, entries, NullPolicy::Keep))
}
