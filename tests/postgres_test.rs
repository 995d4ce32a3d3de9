//! PostgreSQL integration tests
//!
//! Run against the database in `DATABASE_URL`; skipped when it is unset.

mod common;

use polydb::prelude::*;
use polydb::sqlx::PgPool;

async fn connect() -> Option<Connection> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    Some(Connection::postgres(pool))
}

#[tokio::test]
async fn test_insert_then_increment() {
    let Some(conn) = connect().await else { return };
    common::insert_then_increment(&conn, "polydb_pg_increment").await;
}

#[tokio::test]
async fn test_returning_before() {
    let Some(conn) = connect().await else { return };
    common::returning_before(&conn, "polydb_pg_before").await;
}

#[tokio::test]
async fn test_upsert() {
    let Some(conn) = connect().await else { return };
    common::upsert_creates_then_updates(&conn, "polydb_pg_upsert").await;
}

#[tokio::test]
async fn test_upsert_on_filtered_field() {
    let Some(conn) = connect().await else { return };
    common::upsert_on_filtered_field(&conn, "polydb_pg_upsert_filtered").await;
}

#[tokio::test]
async fn test_unset() {
    let Some(conn) = connect().await else { return };
    common::unset_removes_field(&conn, "polydb_pg_unset").await;
}

#[tokio::test]
async fn test_ordered_window() {
    let Some(conn) = connect().await else { return };
    common::ordered_window(&conn, "polydb_pg_window").await;
}

#[tokio::test]
async fn test_json_column() {
    let Some(conn) = connect().await else { return };
    common::json_fields_round_trip(&conn, "polydb_pg_json").await;
}

#[tokio::test]
async fn test_deletes() {
    let Some(conn) = connect().await else { return };
    common::deletes(&conn, "polydb_pg_delete").await;
}

#[tokio::test]
async fn test_transaction() {
    let Some(conn) = connect().await else { return };
    common::transaction_rolls_back(&conn, "polydb_pg_tx").await;
}

#[tokio::test]
async fn test_ensure_table_adds_columns() {
    let Some(conn) = connect().await else { return };
    let class = "polydb_pg_migrate";
    conn.drop_table(class).await.unwrap();

    conn.ensure_table(&Table::new(class).column("name", ColumnType::String))
        .await
        .unwrap();
    conn.ensure_table(
        &Table::new(class)
            .column("name", ColumnType::String)
            .column("score", ColumnType::Double)
            .index(TableIndex::new("polydb_pg_migrate_score").column("score", SortOrder::Desc)),
    )
    .await
    .unwrap();

    let record = conn
        .query()
        .class(class)
        .insert(fields! { "name" => "x", "score" => 1.5 })
        .await
        .unwrap();
    assert_eq!(record["score"], Value::from(1.5));
    assert!(conn.tables().await.unwrap().contains(&class.to_string()));

    conn.drop_columns(class, &["score".to_string()]).await.unwrap();
    let found = conn.query().class(class).first().await.unwrap().unwrap();
    assert!(!found.contains("score"));
}
