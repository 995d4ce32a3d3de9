//! Fluent query builder and the CRUD verbs
//!
//! ```rust,no_run
//! use polydb::prelude::*;
//!
//! # async fn run(conn: Connection) -> Result<(), PolyError> {
//! let adults = conn
//!     .query()
//!     .class("Person")
//!     .filter(Predicate::gte("age", 18))
//!     .sort("age", SortOrder::Desc)
//!     .limit(10)
//!     .to_array()
//!     .await?;
//! # Ok(())
//! # }
//! ```


use crate::core::Connection;
use crate::debug_log;
use crate::driver::{Driver, Returning};
use crate::errors::PolyError;
use crate::plan::{FindQuery, InsertPlan, UpsertPlan};
use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt};
use query_expr::{Predicate, SortOrder, UpdateSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use value_model::{Fields, Record};

/// Records buffered ahead of a [`Query::to_stream`] consumer
const STREAM_BUFFER: usize = 32;

#[derive(Clone)]
pub struct Query {
    connection: Connection,
    find: FindQuery,
}

impl Query {
    pub(crate) fn new(connection: Connection) -> Self {
        Self {
            connection,
            find: FindQuery::default(),
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.find.class = Some(class.into());
        self
    }

    /// Filters accumulate; every one must match
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.find.filters.push(predicate);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.find.sort.push((field.into(), order));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.find.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.find.limit = Some(limit);
        self
    }

    /// Restrict returned fields. `id`, `created_at` and `updated_at` are always
    /// returned.
    pub fn includes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.find.includes = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn find_query(&self) -> &FindQuery {
        &self.find
    }

    fn driver(&self) -> &dyn Driver {
        self.connection.driver.as_ref()
    }

    pub async fn count(&self) -> Result<u64, PolyError> {
        self.find.class_name()?;
        self.driver().count(&self.find).await
    }

    /// Call `body` for each match in order. An error from `body` stops the iteration
    /// and is returned as [`PolyError::Callback`].
    pub async fn for_each<F>(&self, mut body: F) -> Result<(), PolyError>
    where
        F: FnMut(Record) -> anyhow::Result<()> + Send,
    {
        self.find.class_name()?;
        let mut sink = |record: Record| -> BoxFuture<'static, Result<(), PolyError>> {
            Box::pin(future::ready(body(record).map_err(PolyError::Callback)))
        };
        self.driver().for_each(&self.find, &mut sink).await
    }

    pub async fn to_array(&self) -> Result<Vec<Record>, PolyError> {
        let mut records = Vec::new();
        self.for_each(|record| {
            records.push(record);
            Ok(())
        })
        .await?;
        Ok(records)
    }

    /// Matches as a stream, fetched in the background once first polled
    pub fn to_stream(&self) -> BoxStream<'static, Result<Record, PolyError>> {
        let driver = self.connection.driver.clone();
        let find = self.find.clone();

        stream::once(async move {
            let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
            tokio::spawn(produce(driver, find, sender));
            stream::unfold(receiver, |mut receiver| async move {
                receiver.recv().await.map(|item| (item, receiver))
            })
        })
        .flatten()
        .boxed()
    }

    /// First match in sort order
    pub async fn first(&self) -> Result<Option<Record>, PolyError> {
        self.find.class_name()?;

        let mut found = None;
        let mut sink = |record: Record| -> BoxFuture<'static, Result<(), PolyError>> {
            found.get_or_insert(record);
            Box::pin(future::ready(Ok(())))
        };
        self.driver().for_each(&self.find.first(), &mut sink).await?;
        Ok(found)
    }

    /// Write a new record with a fresh id; reserved keys in `fields` are ignored
    pub async fn insert(&self, fields: Fields) -> Result<Record, PolyError> {
        let class = self.find.class_name()?;
        let plan = InsertPlan::new(fields, &self.connection.capabilities);
        debug_log!("insert {} {}", class, plan.id);

        self.driver().insert(class, &plan).await
    }

    /// Apply `update` to the first match; `updated_at` is always refreshed
    pub async fn find_one_and_update(
        &self,
        update: UpdateSet,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        self.find.class_name()?;
        let update = update.stamped(self.connection.capabilities.clock.now());

        self.driver()
            .find_one_and_update(&self.find, &update, returning)
            .await
    }

    /// Plain values, each one a `Set`; a null value removes the field
    pub async fn update_values(
        &self,
        values: Fields,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        self.find_one_and_update(UpdateSet::from_values(values), returning)
            .await
    }

    /// Like [`Query::find_one_and_update`], inserting a record when nothing matches
    ///
    /// The inserted record starts from the filter's equality values, then takes the
    /// update operators on top. A filter pinning the id is rejected.
    pub async fn find_one_and_upsert(
        &self,
        update: UpdateSet,
        set_on_insert: Fields,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        self.find.class_name()?;
        let plan = UpsertPlan::new(
            &self.find,
            update,
            set_on_insert,
            &self.connection.capabilities,
        )?;

        self.driver()
            .find_one_and_upsert(&self.find, &plan, returning)
            .await
    }

    pub async fn upsert_values(
        &self,
        values: Fields,
        set_on_insert: Fields,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        self.find_one_and_upsert(UpdateSet::from_values(values), set_on_insert, returning)
            .await
    }

    pub async fn find_one_and_delete(&self) -> Result<Option<Record>, PolyError> {
        self.find.class_name()?;
        self.driver().find_one_and_delete(&self.find).await
    }

    /// Number of removed records when the backend reports it
    pub async fn delete_all(&self) -> Result<Option<u64>, PolyError> {
        self.find.class_name()?;
        self.driver().delete_all(&self.find).await
    }
}

async fn produce(
    driver: Arc<dyn Driver>,
    find: FindQuery,
    sender: mpsc::Sender<Result<Record, PolyError>>,
) {
    let forward = sender.clone();
    let mut sink = move |record: Record| -> BoxFuture<'static, Result<(), PolyError>> {
        let forward = forward.clone();
        Box::pin(async move {
            forward
                .send(Ok(record))
                .await
                .map_err(|_| PolyError::unknown("record stream dropped"))
        })
    };

    let result = match find.class_name() {
        Ok(_) => driver.for_each(&find, &mut sink).await,
        Err(error) => Err(error),
    };
    if let Err(error) = result {
        // Fails only when the consumer is gone
        let _ = sender.send(Err(error)).await;
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("connection", &self.connection)
            .field("find", &self.find)
            .finish()
    }
}
