use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use value_model::record::{
    Fields, CREATED_AT_FIELD, DOCUMENT_ID_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use value_model::{Number, Value};

/// Operation to perform on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Set the field; `Set(Value::Null)` removes it
    Set(Value),

    /// field = field + n, missing counts as zero
    Increment(Number),

    /// field = field * n, missing counts as zero
    Multiply(Number),

    /// Keep the larger of the current value and the operand
    Max(Value),

    /// Keep the smaller of the current value and the operand
    Min(Value),

    /// Append to an array field
    Push(Value),

    /// Remove every occurrence of the operand's elements from an array field
    RemoveAll(Value),

    PopFirst,
    PopLast,
}

/// Operator kinds, in the order backends receive them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateKind {
    Set,
    Unset,
    Increment,
    Multiply,
    Max,
    Min,
    Push,
    RemoveAll,
    Pop,
}

impl UpdateOperation {
    pub fn kind(&self) -> UpdateKind {
        match self {
            UpdateOperation::Set(Value::Null) => UpdateKind::Unset,
            UpdateOperation::Set(_) => UpdateKind::Set,
            UpdateOperation::Increment(_) => UpdateKind::Increment,
            UpdateOperation::Multiply(_) => UpdateKind::Multiply,
            UpdateOperation::Max(_) => UpdateKind::Max,
            UpdateOperation::Min(_) => UpdateKind::Min,
            UpdateOperation::Push(_) => UpdateKind::Push,
            UpdateOperation::RemoveAll(_) => UpdateKind::RemoveAll,
            UpdateOperation::PopFirst | UpdateOperation::PopLast => UpdateKind::Pop,
        }
    }

    /// Field value this operation produces on a record that lacks the field
    pub fn seed_value(&self) -> Option<Value> {
        self.apply(None)
    }

    /// Field value after applying this operation to `current`, `None` meaning the
    /// field is absent. An operand of the wrong kind for `current` (incrementing a
    /// string, pushing onto a non-array) treats the field as absent.
    pub fn apply(&self, current: Option<&Value>) -> Option<Value> {
        let current = current.filter(|value| !value.is_null());

        match self {
            UpdateOperation::Set(Value::Null) => None,
            UpdateOperation::Set(v) => Some(v.clone()),
            UpdateOperation::Increment(n) => Some(Value::Number(match current {
                Some(Value::Number(base)) => base.plus(n),
                _ => n.clone(),
            })),
            UpdateOperation::Multiply(n) => Some(Value::Number(match current {
                Some(Value::Number(base)) => base.times(n),
                _ => n.zero_like(),
            })),
            UpdateOperation::Max(v) => Some(match current {
                Some(base) if compare(v, base) != Ordering::Greater => base.clone(),
                _ => v.clone(),
            }),
            UpdateOperation::Min(v) => Some(match current {
                Some(base) if compare(v, base) != Ordering::Less => base.clone(),
                _ => v.clone(),
            }),
            UpdateOperation::Push(v) => {
                let mut items = match current {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                items.push(v.clone());
                Some(Value::Array(items))
            }
            UpdateOperation::RemoveAll(removed) => match (current, removed) {
                (Some(Value::Array(items)), Value::Array(removed)) => Some(Value::Array(
                    items
                        .iter()
                        .filter(|item| !removed.contains(*item))
                        .cloned()
                        .collect(),
                )),
                (current, _) => current.cloned(),
            },
            UpdateOperation::PopFirst | UpdateOperation::PopLast => match current {
                Some(Value::Array(items)) => {
                    let mut items = items.clone();
                    if matches!(self, UpdateOperation::PopFirst) {
                        if !items.is_empty() {
                            items.remove(0);
                        }
                    } else {
                        items.pop();
                    }
                    Some(Value::Array(items))
                }
                current => current.cloned(),
            },
        }
    }
}

/// Position of a value's kind in MongoDB's cross-type ordering
fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Binary(_) | Value::Date(_) | Value::Time(_) => 5,
        Value::Boolean(_) => 6,
        Value::Timestamp(_) => 7,
    }
}

/// Ordering used by `Max` and `Min`. Values without a natural order between them
/// compare equal, which keeps the current value.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.to_decimal(), y.to_decimal()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::Binary(x), Value::Binary(y)) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

/// Update operations keyed by field, at most one per field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    pub operations: BTreeMap<String, UpdateOperation>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    /// Plain field values, each one a `Set`
    pub fn from_values(values: Fields) -> Self {
        Self {
            operations: values
                .into_iter()
                .map(|(field, value)| (field, UpdateOperation::Set(value)))
                .collect(),
        }
    }

    pub fn operation(mut self, field: impl Into<String>, operation: UpdateOperation) -> Self {
        self.operations.insert(field.into(), operation);
        self
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operation(field, UpdateOperation::Set(value.into()))
    }

    pub fn unset(self, field: impl Into<String>) -> Self {
        self.operation(field, UpdateOperation::Set(Value::Null))
    }

    pub fn increment(self, field: impl Into<String>, by: impl Into<Number>) -> Self {
        self.operation(field, UpdateOperation::Increment(by.into()))
    }

    pub fn multiply(self, field: impl Into<String>, by: impl Into<Number>) -> Self {
        self.operation(field, UpdateOperation::Multiply(by.into()))
    }

    pub fn max(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operation(field, UpdateOperation::Max(value.into()))
    }

    pub fn min(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operation(field, UpdateOperation::Min(value.into()))
    }

    pub fn push(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operation(field, UpdateOperation::Push(value.into()))
    }

    pub fn remove_all(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.operation(field, UpdateOperation::RemoveAll(Value::Array(values)))
    }

    pub fn pop_first(self, field: impl Into<String>) -> Self {
        self.operation(field, UpdateOperation::PopFirst)
    }

    pub fn pop_last(self, field: impl Into<String>) -> Self {
        self.operation(field, UpdateOperation::PopLast)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Drops operations on the id and creation time, then sets `updated_at` to `now`,
    /// replacing whatever the caller asked for on that field.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        for field in [ID_FIELD, DOCUMENT_ID_FIELD, CREATED_AT_FIELD] {
            self.operations.remove(field);
        }
        self.operations.insert(
            UPDATED_AT_FIELD.to_string(),
            UpdateOperation::Set(Value::from(now)),
        );
        self
    }

    /// Operations grouped by kind, fields in name order within each group
    pub fn group_by_kind(&self) -> BTreeMap<UpdateKind, Vec<(&str, &UpdateOperation)>> {
        let mut groups: BTreeMap<UpdateKind, Vec<(&str, &UpdateOperation)>> = BTreeMap::new();
        for (field, operation) in &self.operations {
            groups
                .entry(operation.kind())
                .or_default()
                .push((field.as_str(), operation));
        }
        groups
    }

    /// Apply every operation to `fields` in place
    pub fn apply_to(&self, fields: &mut Fields) {
        for (field, operation) in &self.operations {
            match operation.apply(fields.get(field)) {
                Some(value) => {
                    fields.insert(field.clone(), value);
                }
                None => {
                    fields.remove(field);
                }
            }
        }
    }

    /// The fields these operations produce on an empty record
    pub fn seed_values(&self) -> Fields {
        let mut fields = Fields::new();
        self.apply_to(&mut fields);
        fields
    }
}
