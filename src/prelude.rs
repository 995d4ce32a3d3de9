//! Convenience re-exports for common polydb usage
//!
//! ```rust
//! use polydb::prelude::*;
//!
//! let bump = UpdateSet::new().increment("age", 5);
//! let adults = Predicate::gte("age", 18);
//! # let _ = (bump, adults);
//! ```

// Core components
pub use crate::capabilities::Capabilities;
pub use crate::core::Connection;
pub use crate::driver::Returning;
pub use crate::errors::PolyError;
pub use crate::query::Query;
pub use crate::schema::{Column, Table, TableIndex};

// Centralized config
pub use config::{AppConfig, DatabaseConfig};

// Query expressions
pub use query_expr::{Predicate, SortOrder, UpdateOperation, UpdateSet};

// Values and records
pub use value_model::{ColumnType, Fields, Number, Record, Value, fields};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use tokio;
