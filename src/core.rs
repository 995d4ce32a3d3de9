//! Core polydb functionality
//!
//! [`Connection`] owns the backend driver and the id/clock capabilities. Queries,
//! transactions and schema changes all start here.

use crate::capabilities::Capabilities;
use crate::debug_log;
use crate::driver::Driver;
use crate::drivers::{MongoDriver, PostgresDriver};
use crate::errors::PolyError;
use crate::query::Query;
use crate::schema::{Column, Table, TableIndex};
use config::{DatabaseConfig, MongoConfig, PostgresConfig};
use mongodb::options::ClientOptions;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Entry point to one database
#[derive(Clone)]
pub struct Connection {
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) capabilities: Capabilities,
}

impl Connection {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_driver(Arc::new(PostgresDriver::new(pool)))
    }

    pub fn mongo(database: mongodb::Database) -> Self {
        Self::from_driver(Arc::new(MongoDriver::new(database)))
    }

    pub fn from_driver(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            capabilities: Capabilities::default(),
        }
    }

    /// Open a pool or client from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PolyError> {
        config.validate()?;
        match config {
            DatabaseConfig::Postgres(postgres) => Self::connect_postgres(postgres).await,
            DatabaseConfig::Mongo(mongo) => Self::connect_mongo(mongo).await,
        }
    }

    async fn connect_postgres(config: &PostgresConfig) -> Result<Self, PolyError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        debug_log!("connected to postgres database {}", config.database);

        Ok(Self::postgres(pool))
    }

    async fn connect_mongo(config: &MongoConfig) -> Result<Self, PolyError> {
        let mut options = ClientOptions::parse(config.connection_string()).await?;
        options.min_pool_size = Some(config.min_connections);
        options.max_pool_size = Some(config.max_connections);
        options.connect_timeout = Some(Duration::from_secs(config.connection_timeout_seconds));

        let client = mongodb::Client::with_options(options)?;
        debug_log!("connected to mongo database {}", config.database);

        Ok(Self::mongo(client.database(&config.database)))
    }

    /// Replace the id generator and clock
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Backend name, `postgres` or `mongo`
    pub fn backend(&self) -> &'static str {
        self.driver.name()
    }

    pub fn query(&self) -> Query {
        Query::new(self.clone())
    }

    /// Run `body` with a connection bound to a new transaction. Commits when `body`
    /// returns `Ok`, aborts otherwise. Nested transactions are not supported.
    pub async fn with_transaction<T, F, Fut>(&self, body: F) -> Result<T, PolyError>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = Result<T, PolyError>>,
    {
        let (driver, session) = self.driver.start_transaction().await?;
        let transactional = Connection {
            driver,
            capabilities: self.capabilities.clone(),
        };

        match body(transactional).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(error) => {
                // The body's error is the one worth reporting
                if let Err(_abort_error) = session.abort().await {
                    debug_log!("transaction abort failed: {}", _abort_error);
                }
                Err(error)
            }
        }
    }

    pub async fn tables(&self) -> Result<Vec<String>, PolyError> {
        self.driver.tables().await
    }

    pub async fn create_table(&self, table: &Table) -> Result<(), PolyError> {
        self.driver.create_table(table).await
    }

    pub async fn add_columns(&self, class: &str, columns: &[Column]) -> Result<(), PolyError> {
        self.driver.add_columns(class, columns).await
    }

    pub async fn drop_table(&self, class: &str) -> Result<(), PolyError> {
        self.driver.drop_table(class).await
    }

    pub async fn drop_columns(&self, class: &str, columns: &[String]) -> Result<(), PolyError> {
        self.driver.drop_columns(class, columns).await
    }

    pub async fn add_index(&self, class: &str, index: &TableIndex) -> Result<(), PolyError> {
        self.driver.add_index(class, index).await
    }

    pub async fn drop_index(&self, class: &str, index: &str) -> Result<(), PolyError> {
        self.driver.drop_index(class, index).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.driver.name())
            .finish_non_exhaustive()
    }
}
