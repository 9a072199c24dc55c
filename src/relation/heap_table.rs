use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::storage::{HeapFile, StorageMgr};
use crate::types::{ColumnAttribute, Handle, ValueDict};

use super::codec::{marshal, unmarshal};
use super::schema::Schema;
use super::DbRelation;

/// A relation whose rows live in slotted pages inside one `HeapFile`
/// named after the table.
pub struct HeapTable {
    storage: Arc<dyn StorageMgr>,
    table_name: String,
    schema: Schema,
    primary_key: Option<Vec<String>>,
    file: Option<HeapFile>,
}

impl HeapTable {
    pub fn new(
        storage: Arc<dyn StorageMgr>,
        table_name: impl Into<String>,
        schema: Schema,
        primary_key: Option<Vec<String>>,
    ) -> Self {
        HeapTable {
            storage,
            table_name: table_name.into(),
            schema,
            primary_key,
            file: None,
        }
    }

    fn filename(&self) -> String {
        format!("{}.db", self.table_name)
    }

    fn file(&self) -> DbResult<&HeapFile> {
        self.file.as_ref().ok_or_else(|| DbError::Catalog(format!("table {} is not open", self.table_name)))
    }

    fn file_mut(&mut self) -> DbResult<&mut HeapFile> {
        let name = self.table_name.clone();
        self.file.as_mut().ok_or_else(|| DbError::Catalog(format!("table {} is not open", name)))
    }
}

impl DbRelation for HeapTable {
    fn create(&mut self) -> DbResult<()> {
        self.file = Some(HeapFile::create(Arc::clone(&self.storage), self.filename())?);
        Ok(())
    }

    fn create_if_not_exists(&mut self) -> DbResult<()> {
        if self.storage.block_count(&self.filename())? > 0 {
            self.open()
        } else {
            self.create()
        }
    }

    fn drop_relation(&mut self) -> DbResult<()> {
        self.file = None;
        self.storage.remove(&self.filename())
    }

    fn open(&mut self) -> DbResult<()> {
        self.file = Some(HeapFile::open(Arc::clone(&self.storage), self.filename())?);
        Ok(())
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn insert(&mut self, row: &ValueDict) -> DbResult<Handle> {
        for name in self.schema.columns() {
            if !row.contains_key(name) {
                return Err(DbError::InvalidArgument(format!(
                    "missing value for column {} of table {}",
                    name, self.table_name
                )));
            }
        }
        let bytes = marshal(&self.schema, row)?;
        let file = self.file_mut()?;
        let last_num = file.last_block_num();
        if last_num >= 1 {
            let blk = file.block_id(last_num);
            let mut page = file.get(&blk)?;
            match page.add(&bytes) {
                Ok(record_id) => {
                    file.put(&blk, &page)?;
                    return Ok(Handle::new(blk, record_id));
                }
                Err(DbError::NoRoom(_)) => {}
                Err(e) => return Err(e),
            }
        }
        let (blk, mut page) = file.get_new()?;
        let record_id = page.add(&bytes)?;
        file.put(&blk, &page)?;
        Ok(Handle::new(blk, record_id))
    }

    fn update(&mut self, handle: &Handle, row: &ValueDict) -> DbResult<Handle> {
        self.del(handle)?;
        self.insert(row)
    }

    fn del(&mut self, handle: &Handle) -> DbResult<()> {
        let file = self.file_mut()?;
        let mut page = file.get(&handle.block_id)?;
        page.del(handle.record_id)?;
        file.put(&handle.block_id, &page)?;
        Ok(())
    }

    fn select(&self) -> DbResult<Vec<Handle>> {
        let file = self.file()?;
        let mut handles = Vec::new();
        for blk in file.block_ids() {
            let page = file.get(&blk)?;
            for record_id in page.ids() {
                handles.push(Handle::new(blk.clone(), record_id));
            }
        }
        Ok(handles)
    }

    fn project(&self, handle: &Handle, names: Option<&[String]>) -> DbResult<ValueDict> {
        let file = self.file()?;
        let page = file.get(&handle.block_id)?;
        let bytes = page.get(handle.record_id)?;
        let row = unmarshal(&self.schema, bytes)?;
        match names {
            None => Ok(row),
            Some(names) => {
                let mut out = ValueDict::new();
                for name in names {
                    let value = row
                        .get(name)
                        .cloned()
                        .ok_or_else(|| DbError::InvalidArgument(format!("unknown column {}", name)))?;
                    out.insert(name.clone(), value);
                }
                Ok(out)
            }
        }
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn column_names(&self) -> &[String] {
        self.schema.columns()
    }

    fn column_attributes(&self, names: &[String]) -> DbResult<Vec<ColumnAttribute>> {
        self.schema.attributes(names)
    }

    fn primary_key(&self) -> Option<&[String]> {
        self.primary_key.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorageMgr;
    use crate::types::Value;

    fn schema() -> Schema {
        let mut s = Schema::new();
        s.add_column("a", ColumnAttribute::int());
        s.add_column("b", ColumnAttribute::text(100));
        s
    }

    fn row(a: i32, b: &str) -> ValueDict {
        let mut r = ValueDict::new();
        r.insert("a".to_string(), Value::Int(a));
        r.insert("b".to_string(), Value::Text(b.to_string()));
        r
    }

    #[test]
    fn insert_then_select_round_trips() {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(400));
        let mut table = HeapTable::new(storage, "foo", schema(), None);
        table.create().unwrap();
        let handle = table.insert(&row(1, "hello")).unwrap();
        let handles = table.select().unwrap();
        assert_eq!(handles, vec![handle.clone()]);
        assert_eq!(table.project(&handle, None).unwrap(), row(1, "hello"));
    }

    #[test]
    fn insert_overflows_into_a_new_block() {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(400));
        let mut table = HeapTable::new(storage, "foo", schema(), None);
        table.create().unwrap();
        for i in 0..500 {
            table.insert(&row(i, &"x".repeat(100))).unwrap();
        }
        let handles = table.select().unwrap();
        assert_eq!(handles.len(), 500);
        let distinct_blocks: std::collections::HashSet<_> =
            handles.iter().map(|h| h.block_id.clone()).collect();
        assert!(distinct_blocks.len() >= 2);
    }

    #[test]
    fn insert_missing_column_is_rejected() {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(400));
        let mut table = HeapTable::new(storage, "foo", schema(), None);
        table.create().unwrap();
        let mut bad_row = ValueDict::new();
        bad_row.insert("a".to_string(), Value::Int(1));
        assert!(table.insert(&bad_row).is_err());
    }

    #[test]
    fn del_removes_the_row_from_subsequent_selects() {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(400));
        let mut table = HeapTable::new(storage, "foo", schema(), None);
        table.create().unwrap();
        let h1 = table.insert(&row(1, "a")).unwrap();
        let h2 = table.insert(&row(2, "b")).unwrap();
        table.del(&h1).unwrap();
        let handles = table.select().unwrap();
        assert_eq!(handles, vec![h2]);
    }
}
