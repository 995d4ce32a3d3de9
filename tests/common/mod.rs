//! Scenarios shared by the backend integration tests
//!
//! Each scenario takes a connection and a class name of its own so tests can run
//! in parallel against the same database.

#![allow(dead_code)]

use futures::TryStreamExt;
use polydb::prelude::*;

pub fn person_table(class: &str) -> Table {
    Table::new(class)
        .column("name", ColumnType::String)
        .column("age", ColumnType::Integer)
        .column("city", ColumnType::String)
        .column("nickname", ColumnType::String)
        .column("visits", ColumnType::Integer)
        .column("profile", ColumnType::Json)
        .column("label", ColumnType::String)
}

pub async fn fresh_table(conn: &Connection, class: &str) {
    let table = person_table(class);
    conn.ensure_table(&table).await.unwrap();
    conn.query().class(class).delete_all().await.unwrap();
}

pub async fn insert_then_increment(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let people = conn.query().class(class);

    let john = people
        .insert(fields! { "name" => "John", "age" => 10 })
        .await
        .unwrap();
    assert!(john.id.is_some());
    assert_eq!(john.created_at, john.updated_at);

    let updated = people
        .clone()
        .filter(Predicate::eq("name", "John"))
        .find_one_and_update(UpdateSet::new().increment("age", 5), Returning::After)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, john.id);
    assert_eq!(updated["age"], Value::from(15));
    assert_eq!(updated.created_at, john.created_at);
    assert!(updated.updated_at >= john.updated_at);

    let found = people.first().await.unwrap().unwrap();
    assert_eq!(found["age"], Value::from(15));
    assert_eq!(people.count().await.unwrap(), 1);
}

pub async fn returning_before(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let people = conn.query().class(class);
    people
        .insert(fields! { "name" => "Ann", "age" => 30 })
        .await
        .unwrap();

    let before = people
        .update_values(fields! { "age" => 31 }, Returning::Before)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before["age"], Value::from(30));

    let missing = people
        .clone()
        .filter(Predicate::eq("name", "Nobody"))
        .update_values(fields! { "age" => 1 }, Returning::After)
        .await
        .unwrap();
    assert_eq!(missing, None);
}

pub async fn upsert_creates_then_updates(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let john = conn
        .query()
        .class(class)
        .filter(Predicate::eq("name", "John"));

    let created = john
        .find_one_and_upsert(
            UpdateSet::new().increment("visits", 1),
            fields! { "city" => "Oslo" },
            Returning::After,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created["name"], Value::from("John"));
    assert_eq!(created["visits"], Value::from(1));
    assert_eq!(created["city"], Value::from("Oslo"));

    let updated = john
        .find_one_and_upsert(
            UpdateSet::new().increment("visits", 1),
            fields! { "city" => "Bergen" },
            Returning::After,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated["visits"], Value::from(2));
    assert_eq!(updated["city"], Value::from("Oslo"));
    assert_eq!(john.count().await.unwrap(), 1);
}

pub async fn upsert_on_filtered_field(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let labelled = conn
        .query()
        .class(class)
        .filter(Predicate::eq("label", "text_1"));

    let created = labelled
        .find_one_and_upsert(
            UpdateSet::new().set("label", "text_1"),
            fields! {},
            Returning::After,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created["label"], Value::from("text_1"));

    let again = labelled
        .find_one_and_upsert(
            UpdateSet::new().set("label", "text_1"),
            fields! {},
            Returning::After,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, created.id);
    assert_eq!(again.created_at, created.created_at);
    assert_eq!(labelled.count().await.unwrap(), 1);

    // Operators build on the value the filter pins
    let pinned = conn
        .query()
        .class(class)
        .filter(Predicate::eq("age", 1))
        .filter(Predicate::eq("visits", 3));
    let inserted = pinned
        .find_one_and_upsert(
            UpdateSet::new().increment("age", 5).multiply("visits", 2),
            fields! {},
            Returning::After,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(inserted["age"], Value::from(6));
    assert_eq!(inserted["visits"], Value::from(6));
}

pub async fn unset_removes_field(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let people = conn.query().class(class);
    people
        .insert(fields! { "name" => "Kim", "nickname" => "K" })
        .await
        .unwrap();

    let updated = people
        .find_one_and_update(UpdateSet::new().unset("nickname"), Returning::After)
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.contains("nickname"));
    assert_eq!(updated["name"], Value::from("Kim"));
}

pub async fn ordered_window(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let people = conn.query().class(class);
    for age in [5, 1, 4, 2, 3] {
        people
            .insert(fields! { "name" => format!("p{}", age), "age" => age })
            .await
            .unwrap();
    }

    let ages: Vec<Value> = people
        .clone()
        .filter(Predicate::gt("age", 1))
        .sort("age", SortOrder::Asc)
        .skip(1)
        .limit(2)
        .to_array()
        .await
        .unwrap()
        .iter()
        .map(|record| record["age"].clone())
        .collect();
    assert_eq!(ages, vec![Value::from(3), Value::from(4)]);

    let streamed: Vec<Record> = people.to_stream().try_collect().await.unwrap();
    assert_eq!(streamed.len(), 5);

    let names: Vec<Record> = people
        .clone()
        .includes(["name"])
        .to_array()
        .await
        .unwrap();
    assert!(names.iter().all(|r| !r.contains("age") && r.id.is_some()));
}

pub async fn json_fields_round_trip(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let people = conn.query().class(class);

    let profile = Value::from(fields! {
        "tags" => vec![Value::from("a"), Value::from("b")],
        "score" => 7,
        "active" => true,
    });
    people
        .insert(fields! { "name" => "Json", "profile" => profile.clone() })
        .await
        .unwrap();

    let found = people.first().await.unwrap().unwrap();
    assert_eq!(found["profile"], profile);
}

pub async fn deletes(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let people = conn.query().class(class);
    for name in ["a", "b", "c"] {
        people.insert(fields! { "name" => name }).await.unwrap();
    }

    let removed = people
        .clone()
        .filter(Predicate::eq("name", "b"))
        .find_one_and_delete()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed["name"], Value::from("b"));
    assert_eq!(people.count().await.unwrap(), 2);

    people.delete_all().await.unwrap();
    assert_eq!(people.count().await.unwrap(), 0);
}

pub async fn transaction_rolls_back(conn: &Connection, class: &str) {
    fresh_table(conn, class).await;
    let owned = class.to_string();

    let result: Result<(), PolyError> = conn
        .with_transaction(|tx| async move {
            tx.query()
                .class(owned)
                .insert(fields! { "name" => "ghost" })
                .await?;
            Err(PolyError::Unknown("roll back".to_string()))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(conn.query().class(class).count().await.unwrap(), 0);

    let owned = class.to_string();
    conn.with_transaction(|tx| async move {
        let people = tx.query().class(owned);
        people.insert(fields! { "name" => "kept" }).await?;
        people
            .find_one_and_update(UpdateSet::new().set("age", 1), Returning::After)
            .await?;
        Ok(())
    })
    .await
    .unwrap();

    let kept = conn.query().class(class).first().await.unwrap().unwrap();
    assert_eq!(kept["age"], Value::from(1));
}
