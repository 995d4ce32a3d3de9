use thiserror::Error;

/// Errors raised while converting between [`crate::Value`] and a native representation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
}

impl CodecError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedType(what.into())
    }
}
