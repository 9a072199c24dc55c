use std::ops::{Deref, DerefMut};

use tempfile::TempDir;

use crate::error::DbResult;
use crate::server::{Config, Database};

const TEST_BLOCK_SIZE: usize = 512;

/// A `Database` paired with the `TempDir` backing it. The directory must
/// outlive the database's open file handles, so `db` is dropped first.
pub struct TempDatabase {
    db: Option<Database>,
    dir: TempDir,
}

impl Deref for TempDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        self.db.as_ref().unwrap()
    }
}

impl DerefMut for TempDatabase {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.db.as_mut().unwrap()
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        self.db.take();
    }
}

pub fn temp_database() -> DbResult<TempDatabase> {
    temp_database_with_cfg(|cfg| cfg)
}

pub fn temp_database_with_cfg(mut cfg_updater: impl FnMut(Config) -> Config) -> DbResult<TempDatabase> {
    let dir = TempDir::new().expect("failed to create temp dir");
    let mut cfg = Config::file(dir.path()).block_size(TEST_BLOCK_SIZE);
    cfg = cfg_updater(cfg);
    let db = Database::open(cfg)?;
    Ok(TempDatabase { db: Some(db), dir })
}
