//! Statement execution against a pool or an open transaction

use crate::errors::PolyError;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use query_expr::SqlArgument;
use sqlx::postgres::{PgArguments, PgConnection, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use value_model::{Number, SqlData};

/// Transaction shared by the bound driver and the session that finishes it.
/// `None` once committed or rolled back.
pub(crate) type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// Bind one collected argument with its native PostgreSQL type
macro_rules! bind_sql_argument {
    ($query:expr, $argument:expr) => {
        match $argument {
            SqlArgument::Json(json) => $query.bind(sqlx::types::Json(json.clone())),
            SqlArgument::Typed(data) => match data {
                SqlData::Null => $query.bind(Option::<String>::None),
                SqlData::Boolean(b) => $query.bind(*b),
                SqlData::String(s) => $query.bind(s.clone()),
                SqlData::Number(Number::Signed(n)) => $query.bind(*n),
                // No unsigned 64-bit type, NUMERIC holds every value
                SqlData::Number(Number::Unsigned(n)) => {
                    $query.bind(bigdecimal::BigDecimal::from(*n))
                }
                SqlData::Number(Number::Float(n)) => $query.bind(*n),
                SqlData::Number(Number::Decimal(d)) => $query.bind(d.clone()),
                SqlData::Timestamp(t) => $query.bind(*t),
                SqlData::Date(d) => $query.bind(*d),
                SqlData::Time(t) => $query.bind(*t),
                SqlData::Binary(bytes) => $query.bind(bytes.clone()),
                SqlData::Array(_) | SqlData::Object(_) => {
                    $query.bind(sqlx::types::Json(data.to_json()))
                }
            },
        }
    };
}

pub(crate) fn bind_arguments<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlArgument],
) -> Query<'q, Postgres, PgArguments> {
    for argument in params {
        query = bind_sql_argument!(query, argument);
    }
    query
}

pub(crate) fn transaction_finished() -> PolyError {
    PolyError::unknown("transaction already finished")
}

#[derive(Clone)]
pub(crate) enum PgExecutor {
    Pool(PgPool),
    Transaction(SharedTransaction),
}

impl PgExecutor {
    pub(crate) async fn fetch_all(
        &self,
        sql: &str,
        params: &[SqlArgument],
    ) -> Result<Vec<PgRow>, PolyError> {
        let query = bind_arguments(sqlx::query(sql), params);
        match self {
            PgExecutor::Pool(pool) => Ok(query.fetch_all(pool).await?),
            PgExecutor::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                Ok(query.fetch_all(&mut **conn).await?)
            }
        }
    }

    pub(crate) async fn fetch_optional(
        &self,
        sql: &str,
        params: &[SqlArgument],
    ) -> Result<Option<PgRow>, PolyError> {
        let query = bind_arguments(sqlx::query(sql), params);
        match self {
            PgExecutor::Pool(pool) => Ok(query.fetch_optional(pool).await?),
            PgExecutor::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                Ok(query.fetch_optional(&mut **conn).await?)
            }
        }
    }

    /// Rows affected
    pub(crate) async fn execute(&self, sql: &str, params: &[SqlArgument]) -> Result<u64, PolyError> {
        let query = bind_arguments(sqlx::query(sql), params);
        let result = match self {
            PgExecutor::Pool(pool) => query.execute(pool).await?,
            PgExecutor::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                query.execute(&mut **conn).await?
            }
        };
        Ok(result.rows_affected())
    }

    /// Stream rows into `on_row`. Inside a transaction the rows are fetched first and
    /// the lock released, so `on_row` may issue further statements on it.
    pub(crate) async fn for_each_row<F>(
        &self,
        sql: &str,
        params: &[SqlArgument],
        mut on_row: F,
    ) -> Result<(), PolyError>
    where
        F: FnMut(PgRow) -> BoxFuture<'static, Result<(), PolyError>> + Send,
    {
        match self {
            PgExecutor::Pool(pool) => {
                let mut rows = bind_arguments(sqlx::query(sql), params).fetch(pool);
                while let Some(row) = rows.try_next().await? {
                    on_row(row).await?;
                }
            }
            PgExecutor::Transaction(_) => {
                for row in self.fetch_all(sql, params).await? {
                    on_row(row).await?;
                }
            }
        }
        Ok(())
    }

    pub(crate) async fn begin(&self) -> Result<SharedTransaction, PolyError> {
        match self {
            PgExecutor::Pool(pool) => Ok(Arc::new(Mutex::new(Some(pool.begin().await?)))),
            PgExecutor::Transaction(_) => {
                Err(PolyError::TransactionUnsupported("nested postgres transaction"))
            }
        }
    }
}

pub(crate) async fn fetch_optional_on(
    conn: &mut PgConnection,
    sql: &str,
    params: &[SqlArgument],
) -> Result<Option<PgRow>, PolyError> {
    Ok(bind_arguments(sqlx::query(sql), params)
        .fetch_optional(&mut *conn)
        .await?)
}

pub(crate) async fn fetch_one_on(
    conn: &mut PgConnection,
    sql: &str,
    params: &[SqlArgument],
) -> Result<PgRow, PolyError> {
    Ok(bind_arguments(sqlx::query(sql), params)
        .fetch_one(&mut *conn)
        .await?)
}
