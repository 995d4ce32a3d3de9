//! Table descriptions used by the DDL verbs
//!
//! Every relational table also carries `id TEXT PRIMARY KEY`, `created_at` and
//! `updated_at`; those are never listed in [`Table::columns`].

use query_expr::SortOrder;
use serde::{Deserialize, Serialize};
use value_model::ColumnType;
use value_model::record::is_reserved;

/// Index column direction
pub type IndexOrder = SortOrder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIndex {
    pub name: String,
    pub columns: Vec<(String, IndexOrder)>,
    #[serde(default)]
    pub is_unique: bool,
}

impl TableIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            is_unique: false,
        }
    }

    pub fn column(mut self, name: impl Into<String>, order: IndexOrder) -> Self {
        self.columns.push((name.into(), order));
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<TableIndex>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    pub fn index(mut self, index: TableIndex) -> Self {
        self.indexes.push(index);
        self
    }

    /// Declared columns minus the system managed ones
    pub fn user_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| !is_reserved(&column.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_columns_skip_reserved() {
        let table = Table::new("Person")
            .column("id", ColumnType::String)
            .column("name", ColumnType::String)
            .column("updated_at", ColumnType::Timestamp);

        let names: Vec<&str> = table.user_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name"]);
    }

    #[test]
    fn test_index_builder() {
        let index = TableIndex::new("person_age")
            .column("age", IndexOrder::Desc)
            .unique();
        assert!(index.is_unique);
        assert_eq!(index.columns, vec![("age".to_string(), SortOrder::Desc)]);
    }
}
