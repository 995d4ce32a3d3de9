use std::collections::BTreeSet;
use value_model::record::{
    is_reserved, CREATED_AT_FIELD, DOCUMENT_ID_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};

/// Fields to return. The system managed fields are always part of a restricted
/// projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    includes: Option<BTreeSet<String>>,
}

impl Projection {
    /// Every field
    pub fn all() -> Self {
        Self { includes: None }
    }

    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            includes: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_all(&self) -> bool {
        self.includes.is_none()
    }

    /// Requested user fields, without the system managed ones
    pub fn user_fields(&self) -> Option<impl Iterator<Item = &str>> {
        self.includes.as_ref().map(|includes| {
            includes
                .iter()
                .map(String::as_str)
                .filter(|field| !is_reserved(field))
        })
    }

    /// Relational column names: `id`, timestamps, then the requested fields
    pub fn sql_columns(&self) -> Option<Vec<&str>> {
        self.user_fields().map(|fields| {
            let mut columns = vec![ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];
            columns.extend(fields);
            columns
        })
    }

    /// Document field names: `_id`, timestamps, then the requested fields
    pub fn document_fields(&self) -> Option<Vec<&str>> {
        self.user_fields().map(|fields| {
            let mut names = vec![DOCUMENT_ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];
            names.extend(fields);
            names
        })
    }
}
