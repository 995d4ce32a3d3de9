//! # polydb
//!
//! A database-agnostic data layer. The same CRUD verbs run against PostgreSQL and
//! MongoDB, and records come back in one lossless value model whichever backend
//! stored them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polydb::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let conn = Connection::connect(&config.database).await?;
//!
//!     conn.ensure_table(
//!         &Table::new("Person")
//!             .column("name", ColumnType::String)
//!             .column("age", ColumnType::Integer),
//!     )
//!     .await?;
//!
//!     let people = conn.query().class("Person");
//!     let john = people.insert(fields! { "name" => "John", "age" => 10 }).await?;
//!
//!     let older = people
//!         .clone()
//!         .filter(Predicate::eq("name", "John"))
//!         .find_one_and_update(UpdateSet::new().increment("age", 5), Returning::After)
//!         .await?;
//!
//!     println!("{:?} -> {:?}", john.id, older.map(|r| r["age"].clone()));
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod capabilities;
pub mod core;
pub mod driver;
pub mod drivers;
pub mod errors;
pub mod migration;
pub mod plan;
pub mod prelude;
pub mod query;
pub mod schema;

#[cfg(test)]
mod testing;

// Re-export the main public types for convenience
pub use capabilities::{Capabilities, Clock, IdGenerator, ObjectIdGenerator, SystemClock};
pub use core::Connection;
pub use driver::{Driver, RecordSink, Returning, Session};
pub use errors::PolyError;
pub use query::Query;
pub use schema::{Column, IndexOrder, Table, TableIndex};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, MongoConfig, PostgresConfig};

// Workspace crates making up the public API
pub use query_expr;
pub use value_model;

// Re-export external dependencies used in public API
pub use async_trait;
pub use bson;
pub use mongodb;
pub use sqlx;
