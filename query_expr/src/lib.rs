//! Backend-neutral query expressions
//!
//! Filters ([`Predicate`]), updates ([`UpdateSet`]), ordering, pagination and
//! projection, plus their compilers: [`SqlGenerator`] for PostgreSQL and
//! [`document`] for MongoDB.

pub mod document;
pub mod errors;
pub mod identifier;
pub mod ordering;
pub mod pagination;
pub mod predicate;
pub mod projection;
pub mod sql_generation;
pub mod update;


pub use errors::CompileError;
pub use identifier::{ValidatedFieldName, ValidatedTableName, ValidationError};
pub use ordering::SortOrder;
pub use pagination::Pagination;
pub use predicate::{Condition, LogicalOperator, Predicate, QueryOperator};
pub use projection::Projection;
pub use sql_generation::{SqlArgument, SqlGenerator};
pub use update::{UpdateKind, UpdateOperation, UpdateSet};
