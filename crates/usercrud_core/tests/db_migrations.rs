use rusqlite::Connection;
use usercrud_core::db::migrations::{current_user_version, latest_version};
use usercrud_core::db::{open_factory, open_factory_in_memory, DbError};
use usercrud_core::{StoreConfig, StoreLocation};

#[test]
fn open_factory_in_memory_applies_all_migrations() {
    let factory = open_factory_in_memory().unwrap();
    let conn = factory.acquire().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "users");
    assert_eq!(factory.location(), &StoreLocation::Memory);
    assert_eq!(factory.max_connections(), 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("users.db"));

    let first = open_factory(&config).unwrap();
    {
        let conn = first.acquire().unwrap();
        conn.execute(
            "INSERT INTO users (name, email, email_normalized, age, created_at)
             VALUES ('Alice', 'a@b.c', 'a@b.c', 30, 1);",
            [],
        )
        .unwrap();
    }
    first.shutdown();

    let second = open_factory(&config).unwrap();
    let conn = second.acquire().unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_factory(&StoreConfig::file(&path)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pooled_connections_enable_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let factory = open_factory(&StoreConfig::file(dir.path().join("fk.db")).with_pool_size(2))
        .unwrap();

    let first = factory.acquire().unwrap();
    let second = factory.acquire().unwrap();
    for conn in [&first, &second] {
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
