//! Backend implementations of [`crate::driver::Driver`]

pub mod mongo;
pub mod postgres;

pub use mongo::MongoDriver;
pub use postgres::PostgresDriver;
