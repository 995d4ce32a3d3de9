//! The capability every backend implements
//!
//! Drivers receive fully prepared plans; class checks, stamping and seeding are done
//! by [`crate::Query`] before any driver method runs.

use crate::errors::PolyError;
use crate::plan::{FindQuery, InsertPlan, UpsertPlan};
use crate::schema::{Column, Table, TableIndex};
use async_trait::async_trait;
use futures::future::BoxFuture;
use query_expr::UpdateSet;
use std::sync::Arc;
use value_model::Record;

/// Which snapshot a find-and-modify verb returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Returning {
    Before,
    #[default]
    After,
}

/// Per-record action driven by [`Driver::for_each`]
pub type RecordSink<'a> =
    dyn FnMut(Record) -> BoxFuture<'static, Result<(), PolyError>> + Send + 'a;

#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn count(&self, query: &FindQuery) -> Result<u64, PolyError>;

    /// Feed every match to `sink` in order; the first sink error stops iteration
    async fn for_each(&self, query: &FindQuery, sink: &mut RecordSink<'_>)
    -> Result<(), PolyError>;

    async fn insert(&self, class: &str, plan: &InsertPlan) -> Result<Record, PolyError>;

    async fn find_one_and_update(
        &self,
        query: &FindQuery,
        update: &UpdateSet,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError>;

    async fn find_one_and_upsert(
        &self,
        query: &FindQuery,
        plan: &UpsertPlan,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError>;

    async fn find_one_and_delete(&self, query: &FindQuery) -> Result<Option<Record>, PolyError>;

    async fn delete_all(&self, query: &FindQuery) -> Result<Option<u64>, PolyError>;

    /// A driver bound to a new transaction, and the handle that finishes it
    async fn start_transaction(&self) -> Result<(Arc<dyn Driver>, Box<dyn Session>), PolyError> {
        Err(PolyError::TransactionUnsupported(self.name()))
    }

    async fn tables(&self) -> Result<Vec<String>, PolyError>;

    /// Create the table with its indexes; an existing table is left alone
    async fn create_table(&self, table: &Table) -> Result<(), PolyError>;

    /// Add columns that do not exist yet
    async fn add_columns(&self, class: &str, columns: &[Column]) -> Result<(), PolyError>;

    async fn drop_table(&self, class: &str) -> Result<(), PolyError>;

    async fn drop_columns(&self, class: &str, columns: &[String]) -> Result<(), PolyError>;

    async fn add_index(&self, class: &str, index: &TableIndex) -> Result<(), PolyError>;

    async fn drop_index(&self, class: &str, index: &str) -> Result<(), PolyError>;
}

/// An open transaction
#[async_trait]
pub trait Session: Send + Sync {
    async fn commit(self: Box<Self>) -> Result<(), PolyError>;

    async fn abort(self: Box<Self>) -> Result<(), PolyError>;
}
