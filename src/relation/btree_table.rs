use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::index::btree::BTreeIndex;
use crate::index::{build_key_profile, DbIndex};
use crate::storage::StorageMgr;
use crate::types::{ColumnAttribute, Handle, Value, ValueDict};

use super::heap_table::HeapTable;
use super::schema::Schema;
use super::DbRelation;

/// A relation declared with a primary key (`_tables.storage_engine =
/// "BTREE"`). Rows are still packed into slotted pages like `HeapTable`,
/// but a unique `BTreeIndex` keyed on the primary key is kept alongside
/// it so the table enforces key uniqueness and the catalog can treat it
/// as a distinct storage engine from a plain `HeapTable`.
pub struct BTreeTable {
    heap: HeapTable,
    pk_index: BTreeIndex,
}

impl BTreeTable {
    pub fn new(
        storage: Arc<dyn StorageMgr>,
        table_name: impl Into<String>,
        schema: Schema,
        primary_key: Vec<String>,
    ) -> DbResult<Self> {
        let table_name = table_name.into();
        let profile = build_key_profile(&schema, &primary_key)?;
        let pk_index = BTreeIndex::new(storage.clone(), &table_name, "pk", primary_key.clone(), profile);
        let heap = HeapTable::new(storage, table_name, schema, Some(primary_key));
        Ok(BTreeTable { heap, pk_index })
    }

    fn primary_key_value(&self, row: &ValueDict) -> DbResult<Vec<Value>> {
        self.heap
            .primary_key()
            .expect("BTreeTable always has a primary key")
            .iter()
            .map(|name| {
                row.get(name)
                    .cloned()
                    .ok_or_else(|| DbError::InvalidArgument(format!("missing value for column {}", name)))
            })
            .collect()
    }
}

impl DbRelation for BTreeTable {
    fn create(&mut self) -> DbResult<()> {
        self.heap.create()?;
        self.pk_index.create()
    }

    fn create_if_not_exists(&mut self) -> DbResult<()> {
        self.heap.create_if_not_exists()?;
        self.pk_index.create()
    }

    fn drop_relation(&mut self) -> DbResult<()> {
        self.pk_index.drop_index()?;
        self.heap.drop_relation()
    }

    fn open(&mut self) -> DbResult<()> {
        self.heap.open()?;
        self.pk_index.open()
    }

    fn close(&mut self) {
        self.heap.close();
        self.pk_index.close();
    }

    fn insert(&mut self, row: &ValueDict) -> DbResult<Handle> {
        let key = self.primary_key_value(row)?;
        if self.pk_index.lookup(&key)?.is_some() {
            return Err(DbError::SchemaViolation("duplicate primary key".to_string()));
        }
        let handle = self.heap.insert(row)?;
        self.pk_index.insert(&key, &handle)?;
        Ok(handle)
    }

    fn update(&mut self, handle: &Handle, row: &ValueDict) -> DbResult<Handle> {
        self.del(handle)?;
        self.insert(row)
    }

    fn del(&mut self, handle: &Handle) -> DbResult<()> {
        self.heap.del(handle)
    }

    fn select(&self) -> DbResult<Vec<Handle>> {
        self.heap.select()
    }

    fn project(&self, handle: &Handle, names: Option<&[String]>) -> DbResult<ValueDict> {
        self.heap.project(handle, names)
    }

    fn table_name(&self) -> &str {
        self.heap.table_name()
    }

    fn column_names(&self) -> &[String] {
        self.heap.column_names()
    }

    fn column_attributes(&self, names: &[String]) -> DbResult<Vec<ColumnAttribute>> {
        self.heap.column_attributes(names)
    }

    fn primary_key(&self) -> Option<&[String]> {
        self.heap.primary_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorageMgr;
    use crate::types::ColumnAttribute;

    fn schema() -> Schema {
        let mut s = Schema::new();
        s.add_column("a", ColumnAttribute::int());
        s.add_column("b", ColumnAttribute::text(20));
        s
    }

    fn row(a: i32, b: &str) -> ValueDict {
        let mut r = ValueDict::new();
        r.insert("a".to_string(), Value::Int(a));
        r.insert("b".to_string(), Value::Text(b.to_string()));
        r
    }

    #[test]
    fn rejects_duplicate_primary_keys() {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(512));
        let mut table = BTreeTable::new(storage, "foo", schema(), vec!["a".to_string()]).unwrap();
        table.create().unwrap();
        table.insert(&row(1, "x")).unwrap();
        assert!(table.insert(&row(1, "y")).is_err());
    }

    #[test]
    fn allows_distinct_keys_and_selects_all_rows() {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(512));
        let mut table = BTreeTable::new(storage, "foo", schema(), vec!["a".to_string()]).unwrap();
        table.create().unwrap();
        table.insert(&row(1, "x")).unwrap();
        table.insert(&row(2, "y")).unwrap();
        assert_eq!(table.select().unwrap().len(), 2);
    }
}
