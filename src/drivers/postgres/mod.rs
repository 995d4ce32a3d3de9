//! PostgreSQL driver over sqlx
//!
//! One table per class with `id`, `created_at` and `updated_at` columns plus one
//! column per top-level field. Nested values live in JSONB columns.

mod ddl;
mod executor;
mod row;
mod statements;


use crate::debug_log;
use crate::driver::{Driver, RecordSink, Returning, Session};
use crate::errors::PolyError;
use crate::plan::{FindQuery, InsertPlan, UpsertPlan};
use crate::schema::{Column, Table, TableIndex};
use async_trait::async_trait;
use executor::{PgExecutor, SharedTransaction, fetch_one_on, fetch_optional_on, transaction_finished};
use futures::future::BoxFuture;
use query_expr::UpdateSet;
use row::row_to_record;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::Row;
use statements::Statement;
use std::sync::Arc;
use value_model::Record;

#[derive(Clone)]
pub struct PostgresDriver {
    executor: PgExecutor,
}

impl PostgresDriver {
    pub fn new(pool: PgPool) -> Self {
        Self {
            executor: PgExecutor::Pool(pool),
        }
    }

    async fn fetch_record(
        &self,
        class: &str,
        statement: &Statement,
    ) -> Result<Option<Record>, PolyError> {
        self.executor
            .fetch_optional(&statement.sql, &statement.params)
            .await?
            .map(|row| row_to_record(class, &row))
            .transpose()
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), PolyError> {
        debug_log!("postgres ddl: {}", sql);
        self.executor.execute(sql, &[]).await?;
        Ok(())
    }
}

/// Statements of one upsert; the update runs first, the insert only without a match
struct UpsertStatements<'a> {
    class: &'a str,
    update: Statement,
    insert: Statement,
    returning: Returning,
}

impl UpsertStatements<'_> {
    async fn run(&self, conn: &mut PgConnection) -> Result<Option<Record>, PolyError> {
        if let Some(row) = fetch_optional_on(conn, &self.update.sql, &self.update.params).await? {
            return Ok(Some(row_to_record(self.class, &row)?));
        }

        let row = fetch_one_on(conn, &self.insert.sql, &self.insert.params).await?;
        match self.returning {
            Returning::Before => Ok(None),
            Returning::After => Ok(Some(row_to_record(self.class, &row)?)),
        }
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn count(&self, query: &FindQuery) -> Result<u64, PolyError> {
        let statement = statements::count(query)?;
        debug_log!("postgres count: {}", statement.sql);

        let row = self
            .executor
            .fetch_optional(&statement.sql, &statement.params)
            .await?
            .ok_or_else(|| PolyError::unknown("COUNT returned no row"))?;
        let count: i64 = row.try_get(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn for_each(
        &self,
        query: &FindQuery,
        sink: &mut RecordSink<'_>,
    ) -> Result<(), PolyError> {
        let class = query.class_name()?;
        let statement = statements::select(query)?;
        debug_log!("postgres find: {}", statement.sql);

        self.executor
            .for_each_row(
                &statement.sql,
                &statement.params,
                |row| -> BoxFuture<'static, Result<(), PolyError>> {
                    match row_to_record(class, &row) {
                        Ok(record) => sink(record),
                        Err(error) => Box::pin(futures::future::ready(Err(error))),
                    }
                },
            )
            .await
    }

    async fn insert(&self, class: &str, plan: &InsertPlan) -> Result<Record, PolyError> {
        let statement = statements::insert(class, plan)?;
        debug_log!("postgres insert: {}", statement.sql);

        self.fetch_record(class, &statement)
            .await?
            .ok_or_else(|| PolyError::unknown("INSERT returned no row"))
    }

    async fn find_one_and_update(
        &self,
        query: &FindQuery,
        update: &UpdateSet,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        let class = query.class_name()?;
        let statement = statements::update_one(query, update, returning)?;
        debug_log!("postgres update: {}", statement.sql);

        self.fetch_record(class, &statement).await
    }

    async fn find_one_and_upsert(
        &self,
        query: &FindQuery,
        plan: &UpsertPlan,
        returning: Returning,
    ) -> Result<Option<Record>, PolyError> {
        let class = query.class_name()?;
        let upsert = UpsertStatements {
            class,
            update: statements::update_one(query, &plan.update, returning)?,
            insert: statements::insert(class, &plan.insert)?,
            returning,
        };
        debug_log!(
            "postgres upsert: {} / {}",
            upsert.update.sql,
            upsert.insert.sql
        );

        match &self.executor {
            PgExecutor::Pool(pool) => {
                let mut tx = pool.begin().await?;
                let record = upsert.run(&mut tx).await?;
                tx.commit().await?;
                Ok(record)
            }
            PgExecutor::Transaction(shared) => {
                let mut guard = shared.lock().await;
                let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                upsert.run(conn).await
            }
        }
    }

    async fn find_one_and_delete(&self, query: &FindQuery) -> Result<Option<Record>, PolyError> {
        let class = query.class_name()?;
        let statement = statements::delete_one(query)?;
        debug_log!("postgres delete: {}", statement.sql);

        self.fetch_record(class, &statement).await
    }

    async fn delete_all(&self, query: &FindQuery) -> Result<Option<u64>, PolyError> {
        let statement = statements::delete_all(query)?;
        debug_log!("postgres delete all: {}", statement.sql);

        let removed = self
            .executor
            .execute(&statement.sql, &statement.params)
            .await?;
        Ok(Some(removed))
    }

    async fn start_transaction(&self) -> Result<(Arc<dyn Driver>, Box<dyn Session>), PolyError> {
        let shared = self.executor.begin().await?;
        debug_log!("postgres transaction started");

        let driver = PostgresDriver {
            executor: PgExecutor::Transaction(shared.clone()),
        };
        Ok((Arc::new(driver), Box::new(PgSession { tx: shared })))
    }

    async fn tables(&self) -> Result<Vec<String>, PolyError> {
        self.executor
            .fetch_all(ddl::TABLES_SQL, &[])
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>(0).map_err(PolyError::from))
            .collect()
    }

    async fn create_table(&self, table: &Table) -> Result<(), PolyError> {
        self.execute_ddl(&ddl::create_table_sql(table)?).await?;
        for index in &table.indexes {
            self.add_index(&table.name, index).await?;
        }
        Ok(())
    }

    async fn add_columns(&self, class: &str, columns: &[Column]) -> Result<(), PolyError> {
        match ddl::add_columns_sql(class, columns)? {
            Some(sql) => self.execute_ddl(&sql).await,
            None => Ok(()),
        }
    }

    async fn drop_table(&self, class: &str) -> Result<(), PolyError> {
        self.execute_ddl(&ddl::drop_table_sql(class)?).await
    }

    async fn drop_columns(&self, class: &str, columns: &[String]) -> Result<(), PolyError> {
        match ddl::drop_columns_sql(class, columns)? {
            Some(sql) => self.execute_ddl(&sql).await,
            None => Ok(()),
        }
    }

    async fn add_index(&self, class: &str, index: &TableIndex) -> Result<(), PolyError> {
        self.execute_ddl(&ddl::create_index_sql(class, index)?).await
    }

    async fn drop_index(&self, _class: &str, index: &str) -> Result<(), PolyError> {
        self.execute_ddl(&ddl::drop_index_sql(index)?).await
    }
}

/// Commit or rollback of a [`PostgresDriver`] transaction
pub struct PgSession {
    tx: SharedTransaction,
}

impl PgSession {
    async fn take(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, PolyError> {
        self.tx.lock().await.take().ok_or_else(transaction_finished)
    }
}

#[async_trait]
impl Session for PgSession {
    async fn commit(self: Box<Self>) -> Result<(), PolyError> {
        self.take().await?.commit().await?;
        debug_log!("postgres transaction committed");
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), PolyError> {
        self.take().await?.rollback().await?;
        debug_log!("postgres transaction rolled back");
        Ok(())
    }
}
