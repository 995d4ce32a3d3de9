//! Canonical value model shared by every polydb backend
//!
//! This crate defines the backend-neutral [`Value`] type, the generic relational
//! representation [`SqlData`], the [`Record`] shape returned to applications and the
//! codecs converting between them and each backend's native values.

pub mod calendar;
pub mod codec;
pub mod errors;
pub mod record;
pub mod sql;
pub mod types;
pub mod value;

pub use calendar::DateComponents;
pub use errors::CodecError;
pub use record::{Fields, NullPolicy, Record, RESERVED_FIELDS};
pub use sql::ColumnType;
pub use types::SqlData;
pub use value::{Number, Value};

/// Build a [`Fields`] map from `key => value` pairs.
///
/// ```rust
/// use value_model::{fields, Value};
///
/// let person = fields! { "name" => "John", "age" => 10 };
/// assert_eq!(person["age"], Value::from(10));
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        ::std::collections::BTreeMap::<::std::string::String, $crate::Value>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::<::std::string::String, $crate::Value>::new();
        $(
            map.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        map
    }};
}
