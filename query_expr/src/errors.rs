use crate::identifier::ValidationError;
use thiserror::Error;
use value_model::CodecError;

/// Failures detected while compiling an expression, before any backend call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Invalid operand for '{field}': {reason}")]
    InvalidOperand { field: String, reason: String },
}

impl CompileError {
    pub fn invalid_operand(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOperand {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
