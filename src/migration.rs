//! Schema synchronization
//!
//! Brings a table in line with its [`Table`] description without dropping anything.

use crate::core::Connection;
use crate::debug_log;
use crate::errors::PolyError;
use crate::schema::Table;

impl Connection {
    /// Create the table when it is missing, otherwise add the columns it lacks.
    /// Indexes are created in both cases.
    pub async fn ensure_table(&self, table: &Table) -> Result<(), PolyError> {
        let existing = self.tables().await?;

        if !existing.contains(&table.name) {
            debug_log!("creating table {}", table.name);
            return self.create_table(table).await;
        }

        debug_log!("updating table {}", table.name);
        let columns: Vec<_> = table.user_columns().cloned().collect();
        self.add_columns(&table.name, &columns).await?;

        for index in &table.indexes {
            self.add_index(&table.name, index).await?;
        }

        Ok(())
    }

    /// Drop and create the table again
    pub async fn recreate_table(&self, table: &Table) -> Result<(), PolyError> {
        debug_log!("recreating table {}", table.name);
        self.drop_table(&table.name).await?;
        self.create_table(table).await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Call, RecordingDriver};
    use crate::schema::{Table, TableIndex};
    use query_expr::SortOrder;
    use value_model::ColumnType;

    fn person() -> Table {
        Table::new("Person")
            .column("name", ColumnType::String)
            .column("age", ColumnType::Integer)
            .index(TableIndex::new("person_age").column("age", SortOrder::Desc))
    }

    #[tokio::test]
    async fn test_ensure_table_creates_missing_table() {
        let driver = RecordingDriver::new();
        let connection = driver.connection();

        connection.ensure_table(&person()).await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![Call::Tables, Call::CreateTable("Person".to_string())]
        );
    }

    #[tokio::test]
    async fn test_ensure_table_adds_columns_to_existing_table() {
        let driver = RecordingDriver::new().with_tables(&["Person"]);
        let connection = driver.connection();

        connection.ensure_table(&person()).await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                Call::Tables,
                Call::AddColumns(
                    "Person".to_string(),
                    vec!["name".to_string(), "age".to_string()]
                ),
                Call::AddIndex("Person".to_string(), "person_age".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_recreate_table() {
        let driver = RecordingDriver::new();
        let connection = driver.connection();

        connection.recreate_table(&person()).await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                Call::DropTable("Person".to_string()),
                Call::CreateTable("Person".to_string())
            ]
        );
    }
}
