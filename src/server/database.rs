use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::DbResult;
use crate::sql::{canonical, Parser, QueryResult, SqlExec, Statement};
use crate::storage::{FileStorageMgr, MemStorageMgr, StorageMgr};

use super::config::{Config, StorageMgrConfig};

/// The top-level handle a CLI or embedder opens: a storage backend, the
/// process-wide schema catalog built on top of it, and the SQL front end.
pub struct Database {
    catalog: Catalog,
    parser: Parser,
}

impl Database {
    pub fn open(config: Config) -> DbResult<Self> {
        let storage: Arc<dyn StorageMgr> = match config.storage_mgr {
            StorageMgrConfig::File(c) => Arc::new(FileStorageMgr::new(&c.db_directory, c.block_size)?),
            StorageMgrConfig::Mem(c) => Arc::new(MemStorageMgr::new(c.block_size)),
        };
        let catalog = Catalog::new(storage)?;
        log::info!("database opened");
        Ok(Database { catalog, parser: Parser::new() })
    }

    pub fn open_dir<P: AsRef<std::path::Path>>(db_directory: P) -> DbResult<Self> {
        Self::open(Config::file(db_directory))
    }

    /// Parses `sql`, returning its canonical stringification alongside the
    /// parsed statement so a caller can echo it before executing.
    pub fn parse(&self, sql: &str) -> DbResult<(Statement, String)> {
        let stmt = self.parser.parse(sql)?;
        let rendered = canonical(&stmt);
        Ok((stmt, rendered))
    }

    pub fn execute(&mut self, stmt: &Statement) -> DbResult<QueryResult> {
        SqlExec::execute(&mut self.catalog, stmt)
    }

    /// Convenience wrapper combining `parse` and `execute`, used by tests
    /// and the self-test routine.
    pub fn run(&mut self, sql: &str) -> DbResult<QueryResult> {
        let (stmt, _) = self.parse(sql)?;
        self.execute(&stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn round_trip_through_database() {
        let mut db = Database::open(Config::mem().block_size(1024)).unwrap();
        db.run("CREATE TABLE foo (a INT, b TEXT)").unwrap();
        db.run("INSERT INTO foo VALUES (1, 'hello')").unwrap();
        let result = db.run("SELECT * FROM foo").unwrap();
        match result {
            QueryResult::Rows { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("a"), Some(&Value::Int(1)));
            }
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn catalog_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db = Database::open(Config::file(dir.path()).block_size(1024)).unwrap();
            db.run("CREATE TABLE foo (a INT)").unwrap();
        }
        let mut db = Database::open(Config::file(dir.path()).block_size(1024)).unwrap();
        let result = db.run("SHOW TABLES").unwrap();
        match result {
            QueryResult::Rows { rows, .. } => assert_eq!(rows.len(), 1),
            _ => panic!("expected rows"),
        }
    }
}
