//! End-to-end flows through the public facade
//!
//! Exercises the registry and table surface the way an embedding
//! application uses it: named tables, JSON-shaped rows in, queries,
//! patches, and teardown.

use shaledb::{Document, Error, Predicate, Registry, Table, Value};

#[test]
fn test_registry_lifecycle() {
    let mut registry = Registry::new();

    registry.add("users").unwrap();
    assert!(registry.contains("users"));

    // Names are unique.
    assert_eq!(
        registry.add("users").unwrap_err(),
        Error::TableExists("users".to_string())
    );

    registry.remove("users").unwrap();
    assert_eq!(
        registry.remove("users").unwrap_err(),
        Error::TableNotFound("users".to_string())
    );
}

#[test]
fn test_crud_through_a_named_table() {
    let mut registry = Registry::new();
    let books = registry.add("books").unwrap();
    books.add_index("author").unwrap();

    let row = Document::try_from(serde_json::json!({
        "title": "The Left Hand of Darkness",
        "author": "le guin",
        "year": 1969,
    }))
    .unwrap();
    let stored = books.create(row);
    assert_eq!(stored.id(), Some(1));

    books.create(
        Document::new()
            .with("title", "The Dispossessed")
            .with("author", "le guin")
            .with("year", 1974),
    );
    books.create(
        Document::new()
            .with("title", "Neuromancer")
            .with("author", "gibson")
            .with("year", 1984),
    );

    let le_guin = books
        .find(&Predicate::new().field("author", "le guin"))
        .unwrap();
    assert_eq!(le_guin.len(), 2);

    let exact = books
        .find(&Predicate::new().field("author", "le guin").field("year", 1974))
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].get("title"), Some(&Value::from("The Dispossessed")));

    let report = books
        .update(
            &Predicate::new().field("author", "gibson"),
            &Document::new().with("read", true),
        )
        .unwrap();
    assert_eq!(report.updated, 1);

    let report = books
        .delete(&Predicate::new().field("author", "le guin"))
        .unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(books.len(), 1);
}

#[test]
fn test_prebuilt_table_registration() {
    let table = Table::builder()
        .rows(vec![
            Document::new().with("sku", "a-1").with("stock", 3),
            Document::new().with("sku", "b-2").with("stock", 0),
        ])
        .index("sku")
        .build()
        .unwrap();

    let mut registry = Registry::new();
    registry.add_table("inventory", table).unwrap();

    let inventory = registry.get("inventory").unwrap();
    assert!(inventory.is_indexed("sku"));
    let hit = inventory
        .find(&Predicate::new().field("sku", "b-2"))
        .unwrap();
    assert_eq!(hit[0].get("stock"), Some(&Value::Int(0)));
}

#[test]
fn test_rows_survive_json_round_trip() {
    let mut registry = Registry::new();
    let events = registry.add("events").unwrap();

    let stored = events.create(
        Document::new()
            .with("kind", "deploy")
            .with("tags", Value::Array(vec![Value::from("ci"), Value::from("prod")])),
    );

    let json: serde_json::Value = stored.clone().into();
    let back = Document::try_from(json).unwrap();
    assert_eq!(back, stored);
    assert_eq!(back.id(), Some(1));
}
