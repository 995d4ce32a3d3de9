//! Codecs between [`crate::Value`] and backend-native representations
//!
//! - [`document`]: BSON, lossless
//! - [`tagged`]: generic relational values, lossless through tag objects
//! - [`sql`]: typed relational columns, tagged below the top level
//! - [`json`]: interchange, lossy for extreme magnitudes

pub mod document;
pub mod json;
pub mod sql;
pub mod tagged;

#[cfg(test)]
mod tests;
