//! Backend-neutral verb plans
//!
//! [`crate::Query`] turns its builder state and the caller's input into these plans;
//! drivers only compile and execute them. Stamping, id assignment and upsert seeding
//! happen here so every backend writes the same record.

use crate::capabilities::Capabilities;
use crate::errors::PolyError;
use chrono::{DateTime, Utc};
use query_expr::{Pagination, Predicate, Projection, SortOrder, UpdateSet};
use value_model::record::{DOCUMENT_ID_FIELD, ID_FIELD, is_reserved};
use value_model::{Fields, Record};

/// Filter, ordering, window and projection of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub class: Option<String>,
    pub filters: Vec<Predicate>,
    pub sort: Vec<(String, SortOrder)>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub includes: Option<Vec<String>>,
}

impl FindQuery {
    pub fn class_name(&self) -> Result<&str, PolyError> {
        self.class.as_deref().ok_or(PolyError::ClassNotSet)
    }

    /// Every filter ANDed together, `None` for "match everything"
    pub fn predicate(&self) -> Option<Predicate> {
        Predicate::all(self.filters.clone())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            skip: self.skip,
            limit: self.limit,
        }
    }

    pub fn projection(&self) -> Projection {
        match &self.includes {
            None => Projection::all(),
            Some(fields) => Projection::only(fields.iter().cloned()),
        }
    }

    /// Same query restricted to its first match
    pub fn first(&self) -> Self {
        Self {
            limit: Some(1),
            ..self.clone()
        }
    }
}

/// A record about to be written for the first time
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub id: String,
    /// Both `created_at` and `updated_at`
    pub now: DateTime<Utc>,
    pub fields: Fields,
}

impl InsertPlan {
    pub fn new(fields: Fields, capabilities: &Capabilities) -> Self {
        Self::at(fields, capabilities.ids.generate(), capabilities.clock.now())
    }

    fn at(fields: Fields, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            now,
            fields: fields
                .into_iter()
                .filter(|(field, _)| !is_reserved(field))
                .collect(),
        }
    }

    pub fn to_record(&self, class: &str) -> Record {
        Record {
            class: class.to_string(),
            id: Some(self.id.clone()),
            created_at: Some(self.now),
            updated_at: Some(self.now),
            fields: self.fields.clone(),
        }
    }
}

/// Update to apply on a match, and the record to create otherwise
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertPlan {
    /// Already stamped with `updated_at`
    pub update: UpdateSet,
    /// Caller supplied fields that only apply on insert
    pub set_on_insert: Fields,
    pub insert: InsertPlan,
}

impl UpsertPlan {
    /// The inserted record starts from the filter's equality fields, takes the
    /// `set_on_insert` fields no operator touches, then has every update operator
    /// applied to it. The filter may not pin the id, since the new record always
    /// gets a fresh one.
    pub fn new(
        query: &FindQuery,
        update: UpdateSet,
        set_on_insert: Fields,
        capabilities: &Capabilities,
    ) -> Result<Self, PolyError> {
        let predicate = query.predicate();
        if let Some(pinned) = [ID_FIELD, DOCUMENT_ID_FIELD]
            .into_iter()
            .find(|field| predicate.as_ref().is_some_and(|p| p.pins(field)))
        {
            return Err(PolyError::InvalidOperand {
                field: pinned.to_string(),
                reason: "an upsert cannot filter on the id of the record it may create"
                    .to_string(),
            });
        }

        let now = capabilities.clock.now();
        let update = update.stamped(now);

        let mut seed = predicate
            .map(|predicate| predicate.equality_fields())
            .unwrap_or_default();
        seed.extend(
            set_on_insert
                .iter()
                .filter(|(field, _)| !update.operations.contains_key(field.as_str()))
                .map(|(field, value)| (field.clone(), value.clone())),
        );
        update.apply_to(&mut seed);

        Ok(Self {
            insert: InsertPlan::at(seed, capabilities.ids.generate(), now),
            update,
            set_on_insert,
        })
    }

    /// `set_on_insert` entries no update operator touches
    pub fn insert_only_fields(&self) -> impl Iterator<Item = (&String, &value_model::Value)> {
        self.set_on_insert.iter().filter(|(field, _)| {
            !is_reserved(field) && !self.update.operations.contains_key(field.as_str())
        })
    }
}
