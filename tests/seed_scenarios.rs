use relationdb::{Config, Database, DbResult, QueryResult};
use tempfile::TempDir;

fn rows_of(result: QueryResult) -> Vec<relationdb::types::ValueDict> {
    match result {
        QueryResult::Rows { rows, .. } => rows,
        QueryResult::Message(m) => panic!("expected rows, got message: {}", m),
    }
}

#[test]
fn round_trip_insert_and_select() -> DbResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut db = Database::open(Config::file(temp_dir.path()))?;

    db.run("CREATE TABLE foo (a INT, b TEXT)")?;
    db.run("INSERT INTO foo VALUES (1, 'hello')")?;
    let rows = rows_of(db.run("SELECT * FROM foo")?);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("a"), Some(&relationdb::types::Value::Int(1)));
    assert_eq!(rows[0].get("b"), Some(&relationdb::types::Value::Text("hello".to_string())));
    Ok(())
}

#[test]
fn page_overflow_spans_multiple_blocks() -> DbResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut db = Database::open(Config::file(temp_dir.path()).block_size(512))?;

    db.run("CREATE TABLE foo (a INT, b TEXT)")?;
    for i in 0..500 {
        db.run(&format!("INSERT INTO foo VALUES ({}, '{}')", i, "x".repeat(100)))?;
    }
    let rows = rows_of(db.run("SELECT * FROM foo")?);
    assert_eq!(rows.len(), 500);
    Ok(())
}

#[test]
fn btree_index_correctness_over_one_thousand_rows() -> DbResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut db = Database::open(Config::file(temp_dir.path()))?;

    db.run("CREATE TABLE foo (a INT, b INT)")?;
    db.run("INSERT INTO foo VALUES (12, 99)")?;
    db.run("INSERT INTO foo VALUES (88, 101)")?;
    for i in 0..1000 {
        db.run(&format!("INSERT INTO foo VALUES ({}, {})", 100 + i, -i))?;
    }
    db.run("CREATE INDEX a_idx ON foo (a)")?;

    for i in 0..1000 {
        let rows = rows_of(db.run(&format!("SELECT a, b FROM foo WHERE a = {}", 100 + i))?);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("b"), Some(&relationdb::types::Value::Int(-i)));
    }
    let rows = rows_of(db.run("SELECT a, b FROM foo WHERE a = 12")?);
    assert_eq!(rows[0].get("b"), Some(&relationdb::types::Value::Int(99)));
    Ok(())
}

#[test]
fn index_driven_select_returns_exact_row() -> DbResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut db = Database::open(Config::file(temp_dir.path()))?;

    db.run("CREATE TABLE foo (a INT, b INT)")?;
    for i in 0..1000 {
        db.run(&format!("INSERT INTO foo VALUES ({}, {})", 100 + i, -i))?;
    }
    db.run("CREATE INDEX a_idx ON foo (a)")?;

    let rows = rows_of(db.run("SELECT a, b FROM foo WHERE a = 500")?);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("a"), Some(&relationdb::types::Value::Int(500)));
    assert_eq!(rows[0].get("b"), Some(&relationdb::types::Value::Int(-400)));
    Ok(())
}

#[test]
fn create_table_failure_leaves_no_catalog_trace() -> DbResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut db = Database::open(Config::file(temp_dir.path()))?;

    db.run("CREATE TABLE t (a INT)")?;
    // Fault injection into the underlying storage isn't reachable through
    // the public API, so this exercises the catalog's most reachable
    // failure mode instead: redefining an existing table must leave the
    // original definition untouched rather than partially overwriting it.
    assert!(db.run("CREATE TABLE t (a INT, b INT)").is_err());
    let columns = rows_of(db.run("SHOW COLUMNS FROM t")?);
    assert_eq!(columns.len(), 1, "the original table definition must be untouched");
    Ok(())
}

#[test]
fn catalog_persists_across_process_restart() -> DbResult<()> {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut db = Database::open(Config::file(temp_dir.path()))?;
        db.run("CREATE TABLE foo (a INT)")?;
        db.run("CREATE TABLE bar (a INT)")?;
    }
    let mut db = Database::open(Config::file(temp_dir.path()))?;
    let rows = rows_of(db.run("SHOW TABLES")?);
    assert_eq!(rows.len(), 2);
    Ok(())
}
