//! In-memory driver recording what the verbs hand to it

use crate::capabilities::{Capabilities, Clock, IdGenerator};
use crate::core::Connection;
use crate::driver::{Driver, RecordSink, Returning, Session};
use crate::errors::PolyError;
use crate::plan::{FindQuery, InsertPlan, UpsertPlan};
use crate::schema::{Column, Table, TableIndex};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use query_expr::UpdateSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use value_model::Record;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Count(FindQuery),
    Find(FindQuery),
    Insert(String, InsertPlan),
    Update(FindQuery, UpdateSet, Returning),
    Upsert(FindQuery, UpsertPlan, Returning),
    Delete(FindQuery),
    DeleteAll(FindQuery),
    Begin,
    Commit,
    Abort,
    Tables,
    CreateTable(String),
    AddColumns(String, Vec<String>),
    DropTable(String),
    DropColumns(String, Vec<String>),
    AddIndex(String, String),
    DropIndex(String, String),
}

#[derive(Clone)]
pub(crate) struct RecordingDriver {
    calls: Arc<Mutex<Vec<Call>>>,
    records: Vec<Record>,
    tables: Vec<String>,
    transactional: bool,
}

impl RecordingDriver {
    pub(crate) fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            records: Vec::new(),
            tables: Vec::new(),
            transactional: true,
        }
    }

    /// Records returned by every find
    pub(crate) fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub(crate) fn with_tables(mut self, tables: &[&str]) -> Self {
        self.tables = tables.iter().map(|t| t.to_string()).collect();
        self
    }

    pub(crate) fn without_transactions(mut self) -> Self {
        self.transactional = false;
        self
    }

    pub(crate) fn connection(&self) -> Connection {
        Connection::from_driver(Arc::new(self.clone())).with_capabilities(fixed_capabilities())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub(crate) fn instant() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

/// Sequential ids `id1`, `id2`, ...
pub(crate) struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("id{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub(crate) struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(crate) fn fixed_capabilities() -> Capabilities {
    Capabilities::new(
        Arc::new(SequentialIds(AtomicUsize::new(0))),
        Arc::new(FixedClock(instant())),
    )
}

#[async_trait]
impl Driver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn count(&self, query: &FindQuery) -> Result<u64, PolyError> {
        self.record(Call::Count(query.clone()));
        Ok(self.records.len() as u64)
    }

    async fn for_each(
        &self,
        query: &FindQuery,
        sink: &mut RecordSink<'_>,
    ) -> Result<(), PolyError> {
        self.record(Call::Find(query.clone()));
        let limit = query.limit.map_or(usize::MAX, |limit| limit as usize);
        for record in self.records.iter().take(limit) {
            sink(record.clone()).await?;
        }
        Ok(())
    }

    async fn insert(&self, class: &str, plan: &InsertPlan) -> Result<Record, PolyError> {
        self.record(Call::Insert(class.to_string(), plan.clone()));
        Ok(plan.to_record(class))
    }

    async fn find_one_and_update(
        &self,
        query: &FindQuery,
        update: &UpdateSet,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        self.record(Call::Update(query.clone(), update.clone(), returning));
        Ok(self.records.first().cloned())
    }

    async fn find_one_and_upsert(
        &self,
        query: &FindQuery,
        plan: &UpsertPlan,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        self.record(Call::Upsert(query.clone(), plan.clone(), returning));
        match (self.records.first(), returning) {
            (Some(found), _) => Ok(Some(found.clone())),
            (None, Returning::Before) => Ok(None),
            (None, Returning::After) => Ok(Some(plan.insert.to_record(query.class_name()?))),
        }
    }

    async fn find_one_and_delete(&self, query: &FindQuery) -> Result<Option<Record>, PolyError> {
        self.record(Call::Delete(query.clone()));
        Ok(self.records.first().cloned())
    }

    async fn delete_all(&self, query: &FindQuery) -> Result<Option<u64>, PolyError> {
        self.record(Call::DeleteAll(query.clone()));
        Ok(Some(self.records.len() as u64))
    }

    async fn start_transaction(&self) -> Result<(Arc<dyn Driver>, Box<dyn Session>), PolyError> {
        if !self.transactional {
            return Err(PolyError::TransactionUnsupported(self.name()));
        }
        self.record(Call::Begin);
        Ok((
            Arc::new(self.clone()),
            Box::new(RecordingSession {
                calls: self.calls.clone(),
            }),
        ))
    }

    async fn tables(&self) -> Result<Vec<String>, PolyError> {
        self.record(Call::Tables);
        Ok(self.tables.clone())
    }

    async fn create_table(&self, table: &Table) -> Result<(), PolyError> {
        self.record(Call::CreateTable(table.name.clone()));
        Ok(())
    }

    async fn add_columns(&self, class: &str, columns: &[Column]) -> Result<(), PolyError> {
        self.record(Call::AddColumns(
            class.to_string(),
            columns.iter().map(|c| c.name.clone()).collect(),
        ));
        Ok(())
    }

    async fn drop_table(&self, class: &str) -> Result<(), PolyError> {
        self.record(Call::DropTable(class.to_string()));
        Ok(())
    }

    async fn drop_columns(&self, class: &str, columns: &[String]) -> Result<(), PolyError> {
        self.record(Call::DropColumns(class.to_string(), columns.to_vec()));
        Ok(())
    }

    async fn add_index(&self, class: &str, index: &TableIndex) -> Result<(), PolyError> {
        self.record(Call::AddIndex(class.to_string(), index.name.clone()));
        Ok(())
    }

    async fn drop_index(&self, class: &str, index: &str) -> Result<(), PolyError> {
        self.record(Call::DropIndex(class.to_string(), index.to_string()));
        Ok(())
    }
}

struct RecordingSession {
    calls: Arc<Mutex<Vec<Call>>>,
}

#[async_trait]
impl Session for RecordingSession {
    async fn commit(self: Box<Self>) -> Result<(), PolyError> {
        self.calls.lock().unwrap().push(Call::Commit);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), PolyError> {
        self.calls.lock().unwrap().push(Call::Abort);
        Ok(())
    }
}
