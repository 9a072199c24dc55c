pub mod btree;

use crate::error::DbResult;
use crate::relation::Schema;
use crate::types::{Handle, KeyProfile, KeyValue};

/// The capability set an index offers the catalog and executor. Only
/// `BTreeIndex` implements this today; `del` and `range` exist on the
/// trait because the catalog treats indices polymorphically, but every
/// implementation may reject them with `Unsupported`.
pub trait DbIndex {
    fn create(&mut self) -> DbResult<()>;
    fn drop_index(&mut self) -> DbResult<()>;
    fn open(&mut self) -> DbResult<()>;
    fn close(&mut self);

    fn lookup(&self, key: &KeyValue) -> DbResult<Option<Handle>>;
    fn range(&self, low: &KeyValue, high: &KeyValue) -> DbResult<Vec<Handle>>;
    fn insert(&mut self, key: &KeyValue, handle: &Handle) -> DbResult<()>;
    fn del(&mut self, key: &KeyValue, handle: &Handle) -> DbResult<()>;

    fn key_columns(&self) -> &[String];
}

/// Derives a key profile from a relation's schema in declared
/// key-column order (not alphabetical — see DESIGN.md).
pub fn build_key_profile(schema: &Schema, key_columns: &[String]) -> DbResult<KeyProfile> {
    schema.attributes(key_columns).map(|attrs| attrs.into_iter().map(|a| a.data_type).collect())
}
