//! Error types for the polydb crate
//!
//! Every verb returns [`PolyError`]. Backend errors pass through unmodified.

use config::ConfigError;
use query_expr::{CompileError, ValidationError};
use thiserror::Error;
use value_model::CodecError;

#[derive(Error, Debug)]
pub enum PolyError {
    #[error("Query has no class")]
    ClassNotSet,

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(ValidationError),

    #[error("Invalid operand for field '{field}': {reason}")]
    InvalidOperand { field: String, reason: String },

    #[error("Transactions are not supported: {0}")]
    TransactionUnsupported(&'static str),

    #[error("Callback failed: {0}")]
    Callback(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl PolyError {
    pub(crate) fn unknown(message: impl Into<String>) -> Self {
        PolyError::Unknown(message.into())
    }
}

impl From<CodecError> for PolyError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::UnsupportedType(name) => PolyError::UnsupportedType(name),
        }
    }
}

impl From<CompileError> for PolyError {
    fn from(error: CompileError) -> Self {
        match error {
            CompileError::Codec(codec) => codec.into(),
            CompileError::InvalidIdentifier(invalid) => PolyError::InvalidIdentifier(invalid),
            CompileError::InvalidOperand { field, reason } => {
                PolyError::InvalidOperand { field, reason }
            }
        }
    }
}

impl From<ValidationError> for PolyError {
    fn from(error: ValidationError) -> Self {
        PolyError::InvalidIdentifier(error)
    }
}
