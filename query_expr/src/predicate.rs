//! Filter expressions
//!
//! A [`Predicate`] is a tree of field comparisons combined with `and`, `or` and
//! `not`. Field paths are dot separated; `id` and `_id` both denote the record id.

use std::ops::{BitAnd, BitOr, Not};
use value_model::record::{is_reserved, Fields};
use value_model::Value;

/// Query condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,     // =
    Ne,     // !=
    Gt,     // >
    Gte,    // >=
    Lt,     // <
    Lte,    // <=
    In,     // operand is an array
    Exists, // operand is a boolean
}

/// Single comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: QueryOperator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Condition(Condition),
    Group {
        operator: LogicalOperator,
        filters: Vec<Predicate>,
    },
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn condition(field: impl Into<String>, operator: QueryOperator, value: Value) -> Self {
        Self::Condition(Condition {
            field: field.into(),
            operator,
            value,
        })
    }

    pub fn and(filters: Vec<Predicate>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    pub fn or(filters: Vec<Predicate>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    pub fn negate(predicate: Predicate) -> Self {
        Self::Not(Box::new(predicate))
    }

    /// `= null` matches null and missing fields
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lte, value.into())
    }

    /// An empty list matches nothing
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::condition(field, QueryOperator::In, Value::Array(values))
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::condition(field, QueryOperator::Exists, Value::Boolean(exists))
    }

    /// AND of every filter, `None` when there is nothing to combine
    pub fn all(mut filters: Vec<Predicate>) -> Option<Predicate> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Self::and(filters)),
        }
    }

    /// Fields pinned to a single value by top-level equality conditions.
    ///
    /// Used to seed the record created by an upsert. Null operands and the system
    /// managed fields are skipped.
    pub fn equality_fields(&self) -> Fields {
        let mut fields = Fields::new();
        self.collect_equalities(&mut fields);
        fields
    }

    /// True when an equality condition in the top-level AND chain fixes `field`,
    /// whatever its operand
    pub fn pins(&self, field: &str) -> bool {
        match self {
            Predicate::Condition(Condition {
                field: name,
                operator: QueryOperator::Eq,
                ..
            }) => name == field,
            Predicate::Group {
                operator: LogicalOperator::And,
                filters,
            } => filters.iter().any(|filter| filter.pins(field)),
            _ => false,
        }
    }

    fn collect_equalities(&self, fields: &mut Fields) {
        match self {
            Predicate::Condition(Condition {
                field,
                operator: QueryOperator::Eq,
                value,
            }) if !value.is_null() && !is_reserved(field) && !field.contains('.') => {
                fields.insert(field.clone(), value.clone());
            }
            Predicate::Group {
                operator: LogicalOperator::And,
                filters,
            } => {
                for filter in filters {
                    filter.collect_equalities(fields);
                }
            }
            _ => {}
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        match self {
            Predicate::Group {
                operator: LogicalOperator::And,
                mut filters,
            } => {
                filters.push(rhs);
                Predicate::and(filters)
            }
            lhs => Predicate::and(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        match self {
            Predicate::Group {
                operator: LogicalOperator::Or,
                mut filters,
            } => {
                filters.push(rhs);
                Predicate::or(filters)
            }
            lhs => Predicate::or(vec![lhs, rhs]),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::negate(self)
    }
}
