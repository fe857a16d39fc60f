//! End-to-end tests against file-backed SQLite databases.

use querykit::config::DriverOptions;
use querykit::db::{ConnectionManager, ConnectionRegistry};
use querykit::error::DbError;
use querykit::models::{ColumnValues, ConnectionConfig, Value};
use tempfile::TempDir;

fn sqlite_config(dir: &TempDir, name: &str, options: DriverOptions) -> ConnectionConfig {
    let path = dir.path().join(format!("{}.db", name));
    ConnectionConfig::sqlite(path.to_str().unwrap())
        .into_builder()
        .options(DriverOptions {
            create_if_missing: true,
            ..options
        })
        .build()
}

fn connected(dir: &TempDir, options: DriverOptions) -> ConnectionManager {
    let manager = ConnectionManager::with_alias(sqlite_config(dir, "shop", options), "shop");
    manager.connect().unwrap();
    manager
}

fn seed_users(manager: &ConnectionManager) {
    manager
        .query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, active INTEGER)")
        .unwrap()
        .execute()
        .unwrap();
    for (id, name) in [(1, "alice"), (2, "carol"), (3, "dave"), (7, "bob")] {
        manager
            .query("INSERT INTO users (id, name, active) VALUES (:id, :name, 1)")
            .unwrap()
            .bind("id", id)
            .bind("name", name)
            .execute()
            .unwrap();
    }
}

#[test]
fn test_fetch_single_user_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let manager = connected(&dir, DriverOptions::default());
    seed_users(&manager);

    let mut query = manager
        .query_with_params(
            "SELECT id, name FROM users WHERE id = :id",
            [("id", Value::Int(7))],
        )
        .unwrap();
    let result = query.fetch().unwrap();

    assert!(query.succeeded());
    assert_eq!(result.num_rows(), 1);
    assert_eq!(
        result.first_value("name").unwrap(),
        Some(&Value::Text("bob".into()))
    );
    assert_eq!(
        result.pluck("name").as_scalar(),
        Some(&Value::Text("bob".into()))
    );
    assert_eq!(result.column_names(), vec!["id", "name"]);
    assert_eq!(result.to_json().unwrap(), r#"[{"id":7,"name":"bob"}]"#);
}

#[test]
fn test_update_reports_affected_rows() {
    let dir = tempfile::tempdir().unwrap();
    let manager = connected(&dir, DriverOptions::default());
    seed_users(&manager);

    let mut update = manager
        .query("UPDATE users SET active = 0 WHERE id < :limit")
        .unwrap()
        .bind(":limit", 7);
    assert_eq!(update.execute().unwrap(), 3);
    assert_eq!(update.affected_rows(), 3);
    assert!(update.succeeded());

    let result = manager
        .query("SELECT id FROM users WHERE active = 0 ORDER BY id")
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(
        result.pluck("id"),
        ColumnValues::List(vec![
            Some(&Value::Int(1)),
            Some(&Value::Int(2)),
            Some(&Value::Int(3))
        ])
    );
    assert_eq!(result.last_value("id").unwrap(), Some(&Value::Int(3)));
}

#[test]
fn test_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let manager = connected(&dir, DriverOptions::default());
    seed_users(&manager);

    let result = manager
        .query("SELECT id, name FROM users WHERE id = :id")
        .unwrap()
        .bind("id", 999)
        .fetch()
        .unwrap();
    assert!(result.is_empty());
    assert!(result.column_names().is_empty());
    assert_eq!(result.to_json().unwrap(), "[]");
    assert!(matches!(
        result.first(),
        Err(DbError::IndexOutOfRange { index: 0, len: 0 })
    ));
}

#[test]
fn test_sql_error_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let manager = connected(&dir, DriverOptions::default());

    let mut query = manager.query("SELECT * FROM no_such_table").unwrap();
    let err = query.fetch().unwrap_err();
    assert!(matches!(err, DbError::Database { .. }), "got {:?}", err);
    assert!(!query.succeeded());
}

#[test]
fn test_closed_connection_fails_outstanding_query() {
    let dir = tempfile::tempdir().unwrap();
    let manager = connected(&dir, DriverOptions::default());
    let mut query = manager.query("SELECT 1 AS one").unwrap();

    manager.close();
    assert!(!manager.is_connected());
    assert!(matches!(query.fetch(), Err(DbError::ConnectionClosed)));

    // Reconnecting gives a fresh handle
    manager.connect().unwrap();
    let result = manager.query("SELECT 1 AS one").unwrap().fetch().unwrap();
    assert_eq!(result.first_value("one").unwrap(), Some(&Value::Int(1)));
}

#[test]
fn test_driver_options_shape_rows() {
    let dir = tempfile::tempdir().unwrap();
    let manager = connected(&dir, DriverOptions::default());
    manager
        .query("CREATE TABLE notes (Id INTEGER, Body TEXT)")
        .unwrap()
        .execute()
        .unwrap();
    manager
        .query("INSERT INTO notes (Id, Body) VALUES (1, '')")
        .unwrap()
        .execute()
        .unwrap();

    let result = manager.query("SELECT Id, Body FROM notes").unwrap().fetch().unwrap();
    assert_eq!(result.column_names(), vec!["id", "body"]);
    assert_eq!(result.first_value("body").unwrap(), Some(&Value::Null));
    manager.close();

    let raw = ConnectionManager::new(sqlite_config(
        &dir,
        "shop",
        DriverOptions {
            lowercase_columns: false,
            empty_string_as_null: false,
            ..DriverOptions::default()
        },
    ));
    raw.connect().unwrap();
    let result = raw.query("SELECT Id, Body FROM notes").unwrap().fetch().unwrap();
    assert_eq!(result.column_names(), vec!["Id", "Body"]);
    assert_eq!(
        result.first_value("Body").unwrap(),
        Some(&Value::Text(String::new()))
    );
}

#[test]
fn test_value_types_round_trip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let manager = connected(&dir, DriverOptions::default());
    manager
        .query("CREATE TABLE samples (i INTEGER, r REAL, t TEXT, b BLOB, n TEXT)")
        .unwrap()
        .execute()
        .unwrap();

    let mut insert = manager
        .query("INSERT INTO samples (i, r, t, b, n) VALUES (:i, :r, :t, :b, :n)")
        .unwrap()
        .bind("i", 42)
        .bind("r", 1.5)
        .bind("t", "héllo")
        .bind("b", vec![0u8, 1, 2])
        .bind("n", Value::Null);
    insert.execute().unwrap();
    assert_eq!(insert.last_insert_id(), Some(1));

    let result = manager.query("SELECT * FROM samples").unwrap().fetch().unwrap();
    let row = result.first().unwrap();
    assert_eq!(row.get("i"), Some(&Value::Int(42)));
    assert_eq!(row.get("r"), Some(&Value::Float(1.5)));
    assert_eq!(row.get("t"), Some(&Value::Text("héllo".into())));
    assert_eq!(row.get("b"), Some(&Value::Bytes(vec![0, 1, 2])));
    assert_eq!(row.get("n"), Some(&Value::Null));
    assert_eq!(
        result.to_json_value(),
        serde_json::json!([{ "i": 42, "r": 1.5, "t": "héllo", "b": "AAEC", "n": null }])
    );
}

#[test]
fn test_registry_shares_connections() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConnectionRegistry::new();
    registry.configure(
        sqlite_config(&dir, "shop", DriverOptions::default()),
        Some("shop"),
    );

    registry.get("shop").unwrap().connect().unwrap();
    // Any holder of the alias sees the same live connection
    let manager = registry.lookup("shop");
    assert!(manager.is_connected());
    seed_users(&manager);

    registry.close_all();
    assert!(!manager.is_connected());
    assert!(registry.is_empty());
}
