//! MongoDB driver
//!
//! One collection per class. The record id is `_id`; fields are stored with the
//! document codec, so precise numbers and calendar values survive.

mod commands;


use crate::debug_log;
use crate::driver::{Driver, RecordSink, Returning, Session};
use crate::errors::PolyError;
use crate::plan::{FindQuery, InsertPlan, UpsertPlan};
use crate::schema::{Column, Table, TableIndex};
use async_trait::async_trait;
use bson::{Bson, Document};
use commands::document_to_record;
use futures::TryStreamExt;
use mongodb::{ClientSession, Collection, Database};
use query_expr::UpdateSet;
use query_expr::document::compile_update;
use std::sync::Arc;
use tokio::sync::Mutex;
use value_model::Record;

/// Run an action, inside the driver's transaction session when it has one
macro_rules! run_action {
    ($driver:expr, $action:expr) => {
        match &$driver.session {
            Some(session) => {
                let mut guard = session.lock().await;
                $action.session(&mut *guard).await
            }
            None => $action.await,
        }
    };
}

#[derive(Clone)]
pub struct MongoDriver {
    database: Database,
    session: Option<Arc<Mutex<ClientSession>>>,
}

impl MongoDriver {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            session: None,
        }
    }

    fn collection(&self, class: &str) -> Collection<Document> {
        self.database.collection::<Document>(class)
    }

    fn decode_optional(
        class: &str,
        document: Option<Document>,
    ) -> Result<Option<Record>, PolyError> {
        document
            .map(|document| document_to_record(class, &document))
            .transpose()
    }
}

#[async_trait]
impl Driver for MongoDriver {
    fn name(&self) -> &'static str {
        "mongo"
    }

    async fn count(&self, query: &FindQuery) -> Result<u64, PolyError> {
        let collection = self.collection(query.class_name()?);
        let filter = commands::filter(query)?;
        debug_log!("mongo count {}: {}", collection.name(), filter);

        Ok(run_action!(self, collection.count_documents(filter))?)
    }

    async fn for_each(
        &self,
        query: &FindQuery,
        sink: &mut RecordSink<'_>,
    ) -> Result<(), PolyError> {
        let class = query.class_name()?;
        let collection = self.collection(class);
        let filter = commands::filter(query)?;
        let options = commands::find_options(query);
        debug_log!("mongo find {}: {} {:?}", class, filter, options);

        match &self.session {
            None => {
                let mut cursor = collection.find(filter).with_options(options).await?;
                while let Some(document) = cursor.try_next().await? {
                    sink(document_to_record(class, &document)?).await?;
                }
            }
            // Drain the cursor first so the sink may use the session too
            Some(session) => {
                let documents = {
                    let mut guard = session.lock().await;
                    let mut cursor = collection
                        .find(filter)
                        .with_options(options)
                        .session(&mut *guard)
                        .await?;
                    let mut documents = Vec::new();
                    while let Some(document) = cursor.next(&mut *guard).await {
                        documents.push(document?);
                    }
                    documents
                };
                for document in documents {
                    sink(document_to_record(class, &document)?).await?;
                }
            }
        }
        Ok(())
    }

    async fn insert(&self, class: &str, plan: &InsertPlan) -> Result<Record, PolyError> {
        let collection = self.collection(class);
        let document = commands::insert_document(plan)?;
        debug_log!("mongo insert {}: {}", class, document);

        let result = run_action!(self, collection.insert_one(&document))?;
        if matches!(result.inserted_id, Bson::Null) {
            return Err(PolyError::unknown("insert reported no id"));
        }
        Ok(plan.to_record(class))
    }

    async fn find_one_and_update(
        &self,
        query: &FindQuery,
        update: &UpdateSet,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        let class = query.class_name()?;
        let collection = self.collection(class);
        let filter = commands::filter(query)?;
        let modifications = compile_update(update)?;
        let options = commands::update_options(query, returning, false);
        debug_log!("mongo update {}: {} {}", class, filter, modifications);

        let document = run_action!(
            self,
            collection
                .find_one_and_update(filter, modifications)
                .with_options(options)
        )?;
        Self::decode_optional(class, document)
    }

    async fn find_one_and_upsert(
        &self,
        query: &FindQuery,
        plan: &UpsertPlan,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        let class = query.class_name()?;
        let collection = self.collection(class);
        let filter = commands::filter(query)?;
        let modifications = commands::upsert_update(plan)?;
        let options = commands::update_options(query, returning, true);
        debug_log!("mongo upsert {}: {} {}", class, filter, modifications);

        let document = run_action!(
            self,
            collection
                .find_one_and_update(filter, modifications)
                .with_options(options)
        )?;
        Self::decode_optional(class, document)
    }

    async fn find_one_and_delete(&self, query: &FindQuery) -> Result<Option<Record>, PolyError> {
        let class = query.class_name()?;
        let collection = self.collection(class);
        let filter = commands::filter(query)?;
        let options = commands::delete_options(query);
        debug_log!("mongo delete {}: {}", class, filter);

        let document = run_action!(
            self,
            collection
                .find_one_and_delete(filter)
                .with_options(options)
        )?;
        Self::decode_optional(class, document)
    }

    async fn delete_all(&self, query: &FindQuery) -> Result<Option<u64>, PolyError> {
        let collection = self.collection(query.class_name()?);
        let filter = commands::filter(query)?;
        debug_log!("mongo delete all {}: {}", collection.name(), filter);

        let result = run_action!(self, collection.delete_many(filter))?;
        Ok(Some(result.deleted_count))
    }

    async fn start_transaction(&self) -> Result<(Arc<dyn Driver>, Box<dyn Session>), PolyError> {
        if self.session.is_some() {
            return Err(PolyError::TransactionUnsupported("nested mongo transaction"));
        }

        let mut session = self.database.client().start_session().await?;
        session.start_transaction().await?;
        debug_log!("mongo transaction started");

        let shared = Arc::new(Mutex::new(session));
        let driver = MongoDriver {
            database: self.database.clone(),
            session: Some(shared.clone()),
        };
        Ok((Arc::new(driver), Box::new(MongoSession { session: shared })))
    }

    async fn tables(&self) -> Result<Vec<String>, PolyError> {
        Ok(run_action!(self, self.database.list_collection_names())?)
    }

    async fn create_table(&self, table: &Table) -> Result<(), PolyError> {
        if !self.tables().await?.contains(&table.name) {
            debug_log!("mongo create collection {}", table.name);
            run_action!(self, self.database.create_collection(table.name.as_str()))?;
        }
        for index in &table.indexes {
            self.add_index(&table.name, index).await?;
        }
        Ok(())
    }

    /// Documents are schemaless
    async fn add_columns(&self, _class: &str, _columns: &[Column]) -> Result<(), PolyError> {
        Ok(())
    }

    async fn drop_table(&self, class: &str) -> Result<(), PolyError> {
        debug_log!("mongo drop collection {}", class);
        let collection = self.collection(class);
        Ok(run_action!(self, collection.drop())?)
    }

    async fn drop_columns(&self, class: &str, columns: &[String]) -> Result<(), PolyError> {
        if columns.is_empty() {
            return Ok(());
        }
        let collection = self.collection(class);
        let update = commands::unset_fields(columns);
        debug_log!("mongo drop fields {}: {}", class, update);

        run_action!(self, collection.update_many(Document::new(), update))?;
        Ok(())
    }

    async fn add_index(&self, class: &str, index: &TableIndex) -> Result<(), PolyError> {
        let collection = self.collection(class);
        let model = commands::index_model(index)?;
        debug_log!("mongo create index {}: {:?}", class, model);

        run_action!(self, collection.create_index(model))?;
        Ok(())
    }

    async fn drop_index(&self, class: &str, index: &str) -> Result<(), PolyError> {
        let collection = self.collection(class);
        debug_log!("mongo drop index {}: {}", class, index);

        Ok(run_action!(self, collection.drop_index(index))?)
    }
}

/// Commit or abort of a [`MongoDriver`] transaction
pub struct MongoSession {
    session: Arc<Mutex<ClientSession>>,
}

#[async_trait]
impl Session for MongoSession {
    async fn commit(self: Box<Self>) -> Result<(), PolyError> {
        self.session.lock().await.commit_transaction().await?;
        debug_log!("mongo transaction committed");
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), PolyError> {
        self.session.lock().await.abort_transaction().await?;
        debug_log!("mongo transaction aborted");
        Ok(())
    }
}
