pub mod btree_table;
pub mod codec;
pub mod heap_table;
pub mod schema;

pub use btree_table::BTreeTable;
pub use heap_table::HeapTable;
pub use schema::Schema;

use crate::error::DbResult;
use crate::types::{ColumnAttribute, Handle, ValueDict};

/// The capability set every storage engine variant offers: `HeapTable`
/// (records packed into slotted pages) and `BTreeTable` (records keyed
/// and stored by a unique B+Tree). The catalog stores these behind a
/// trait object so it can hand out either kind under one name.
pub trait DbRelation {
    fn create(&mut self) -> DbResult<()>;
    fn create_if_not_exists(&mut self) -> DbResult<()>;
    fn drop_relation(&mut self) -> DbResult<()>;
    fn open(&mut self) -> DbResult<()>;
    fn close(&mut self);

    fn insert(&mut self, row: &ValueDict) -> DbResult<Handle>;
    fn update(&mut self, handle: &Handle, row: &ValueDict) -> DbResult<Handle>;
    fn del(&mut self, handle: &Handle) -> DbResult<()>;

    /// Every handle currently in the relation, in `(block_id, record_id)`
    /// ascending order. No predicate pushdown: filtering a WHERE clause
    /// against these handles is the executor's job.
    fn select(&self) -> DbResult<Vec<Handle>>;

    /// The full row at `handle`, or just the named columns when `names`
    /// is `Some`.
    fn project(&self, handle: &Handle, names: Option<&[String]>) -> DbResult<ValueDict>;

    fn table_name(&self) -> &str;
    fn column_names(&self) -> &[String];
    fn column_attributes(&self, names: &[String]) -> DbResult<Vec<ColumnAttribute>>;
    fn primary_key(&self) -> Option<&[String]>;
}
