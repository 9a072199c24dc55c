use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::index::DbIndex;
use crate::storage::{HeapFile, StorageMgr};
use crate::types::{Handle, KeyProfile, KeyValue};

use super::interior::BTreeInterior;
use super::leaf::BTreeLeafIndex;
use super::stat::BTreeStat;

const STAT_BLOCK: i32 = 1;

/// A unique secondary index persisted as its own `HeapFile` named
/// `<table>-<index>`. Block 1 holds the `BTreeStat`; every other block is
/// either an interior directory node or a leaf.
pub struct BTreeIndex {
    storage: Arc<dyn StorageMgr>,
    filename: String,
    table_filename: String,
    key_columns: Vec<String>,
    key_profile: KeyProfile,
    file: Option<HeapFile>,
}

impl BTreeIndex {
    pub fn new(
        storage: Arc<dyn StorageMgr>,
        table_name: &str,
        index_name: &str,
        key_columns: Vec<String>,
        key_profile: KeyProfile,
    ) -> Self {
        BTreeIndex {
            storage,
            filename: format!("{}-{}.db", table_name, index_name),
            table_filename: format!("{}.db", table_name),
            key_columns,
            key_profile,
            file: None,
        }
    }

    fn file(&self) -> DbResult<&HeapFile> {
        self.file.as_ref().ok_or_else(|| DbError::Catalog(format!("index {} is not open", self.filename)))
    }

    fn file_mut(&mut self) -> DbResult<&mut HeapFile> {
        self.file.as_mut().ok_or_else(|| DbError::Catalog("index is not open".to_string()))
    }

    fn block_size(&self) -> usize {
        self.storage.block_size()
    }

    fn load_stat(&self) -> DbResult<BTreeStat> {
        let file = self.file()?;
        let page = file.get(&file.block_id(STAT_BLOCK))?;
        Ok(BTreeStat::from_page(&page))
    }

    fn save_stat(&self, stat: &BTreeStat) -> DbResult<()> {
        let file = self.file()?;
        file.put(&file.block_id(STAT_BLOCK), &stat.to_page(self.block_size()))
    }

    fn load_interior(&self, blk_num: i32) -> DbResult<BTreeInterior> {
        let file = self.file()?;
        let page = file.get(&file.block_id(blk_num))?;
        BTreeInterior::from_page(&page, &self.key_profile)
    }

    fn load_leaf(&self, blk_num: i32) -> DbResult<BTreeLeafIndex> {
        let file = self.file()?;
        let page = file.get(&file.block_id(blk_num))?;
        BTreeLeafIndex::from_page(&page, &self.key_profile, &self.table_filename)
    }

    fn lookup_recursive(&self, node: i32, height: i32, key: &KeyValue) -> DbResult<Option<Handle>> {
        if height == 1 {
            self.load_leaf(node)?.find_eq(key)
        } else {
            let interior = self.load_interior(node)?;
            let child = interior.find(key)?;
            self.lookup_recursive(child, height - 1, key)
        }
    }

    /// Recurses to a leaf, inserts, and propagates any split upward.
    /// Returns `Some((new_block, boundary))` when the node at `node` had
    /// to split.
    fn insert_recursive(
        &mut self,
        node: i32,
        height: i32,
        key: &KeyValue,
        handle: &Handle,
    ) -> DbResult<Option<(i32, KeyValue)>> {
        if height == 1 {
            let mut leaf = self.load_leaf(node)?;
            leaf.insert(key.clone(), handle.clone())?;
            match leaf.to_page(self.block_size(), &self.key_profile) {
                Ok(page) => {
                    let blk = self.file()?.block_id(node);
                    self.file()?.put(&blk, &page)?;
                    Ok(None)
                }
                Err(DbError::NoRoom(_)) => {
                    let (mut right, boundary) = leaf.split();
                    let (new_blk, _) = self.file_mut()?.get_new()?;
                    right.next_leaf = leaf.next_leaf;
                    leaf.next_leaf = new_blk.number();
                    let blk = self.file()?.block_id(node);
                    self.file()?.put(&blk, &leaf.to_page(self.block_size(), &self.key_profile)?)?;
                    self.file()?.put(&new_blk, &right.to_page(self.block_size(), &self.key_profile)?)?;
                    Ok(Some((new_blk.number(), boundary)))
                }
                Err(e) => Err(e),
            }
        } else {
            let mut interior = self.load_interior(node)?;
            let child = interior.find(key)?;
            let split = self.insert_recursive(child, height - 1, key, handle)?;
            match split {
                None => Ok(None),
                Some((new_block, boundary)) => {
                    interior.insert(boundary, new_block)?;
                    match interior.to_page(self.block_size(), &self.key_profile) {
                        Ok(page) => {
                            let blk = self.file()?.block_id(node);
                            self.file()?.put(&blk, &page)?;
                            Ok(None)
                        }
                        Err(DbError::NoRoom(_)) => {
                            let (right, up_boundary) = interior.split();
                            let (new_blk, _) = self.file_mut()?.get_new()?;
                            let blk = self.file()?.block_id(node);
                            self.file()?.put(&blk, &interior.to_page(self.block_size(), &self.key_profile)?)?;
                            self.file()?.put(&new_blk, &right.to_page(self.block_size(), &self.key_profile)?)?;
                            Ok(Some((new_blk.number(), up_boundary)))
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        }
    }
}

impl DbIndex for BTreeIndex {
    /// Allocates block 1 as the stat block (root = block 2, height = 1)
    /// and an empty leaf at block 2. Bulk-building from existing rows is
    /// the caller's responsibility (see `SqlExec::create_index`), since
    /// the index itself has no reference to its owning relation.
    fn create(&mut self) -> DbResult<()> {
        let mut file = HeapFile::create(Arc::clone(&self.storage), self.filename.clone())?;
        let block_size = self.storage.block_size();
        let (root_blk, _) = file.get_new()?;
        file.put(&root_blk, &BTreeLeafIndex::new().to_page(block_size, &self.key_profile)?)?;
        let stat = BTreeStat::new(root_blk.number(), 1);
        file.put(&file.block_id(STAT_BLOCK), &stat.to_page(block_size))?;
        self.file = Some(file);
        Ok(())
    }

    fn drop_index(&mut self) -> DbResult<()> {
        self.file = None;
        self.storage.remove(&self.filename)
    }

    fn open(&mut self) -> DbResult<()> {
        self.file = Some(HeapFile::open(Arc::clone(&self.storage), self.filename.clone())?);
        Ok(())
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn lookup(&self, key: &KeyValue) -> DbResult<Option<Handle>> {
        let stat = self.load_stat()?;
        self.lookup_recursive(stat.root_id, stat.height, key)
    }

    fn range(&self, _low: &KeyValue, _high: &KeyValue) -> DbResult<Vec<Handle>> {
        Err(DbError::Unsupported("range queries are not implemented for BTreeIndex".to_string()))
    }

    fn insert(&mut self, key: &KeyValue, handle: &Handle) -> DbResult<()> {
        let stat = self.load_stat()?;
        if let Some((new_block, boundary)) = self.insert_recursive(stat.root_id, stat.height, key, handle)? {
            let mut new_root = BTreeInterior::new(stat.root_id);
            new_root.insert(boundary, new_block)?;
            let (new_root_blk, _) = self.file_mut()?.get_new()?;
            self.file()?.put(&new_root_blk, &new_root.to_page(self.block_size(), &self.key_profile)?)?;
            self.save_stat(&BTreeStat::new(new_root_blk.number(), stat.height + 1))?;
        }
        Ok(())
    }

    fn del(&mut self, _key: &KeyValue, _handle: &Handle) -> DbResult<()> {
        Err(DbError::Unsupported("delete is not implemented for BTreeIndex".to_string()))
    }

    fn key_columns(&self) -> &[String] {
        &self.key_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BlockId, MemStorageMgr};
    use crate::types::{DataType, Value};

    fn index() -> BTreeIndex {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(256));
        let mut idx = BTreeIndex::new(storage, "foo", "a_idx", vec!["a".to_string()], vec![DataType::Int]);
        idx.create().unwrap();
        idx
    }

    fn handle(n: i32) -> Handle {
        Handle::new(BlockId::new("foo.db", n), 1)
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut idx = index();
        idx.insert(&vec![Value::Int(12)], &handle(1)).unwrap();
        idx.insert(&vec![Value::Int(88)], &handle(2)).unwrap();
        assert_eq!(idx.lookup(&vec![Value::Int(12)]).unwrap(), Some(handle(1)));
        assert_eq!(idx.lookup(&vec![Value::Int(88)]).unwrap(), Some(handle(2)));
        assert_eq!(idx.lookup(&vec![Value::Int(5)]).unwrap(), None);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut idx = index();
        idx.insert(&vec![Value::Int(1)], &handle(1)).unwrap();
        assert!(idx.insert(&vec![Value::Int(1)], &handle(2)).is_err());
    }

    #[test]
    fn many_inserts_force_splits_and_stay_correct() {
        let mut idx = index();
        for i in 0..1000 {
            idx.insert(&vec![Value::Int(100 + i)], &handle(i)).unwrap();
        }
        for i in 0..1000 {
            assert_eq!(idx.lookup(&vec![Value::Int(100 + i)]).unwrap(), Some(handle(i)));
        }
        assert_eq!(idx.lookup(&vec![Value::Int(99)]).unwrap(), None);
    }

    #[test]
    fn del_and_range_are_unsupported() {
        let mut idx = index();
        assert!(matches!(idx.del(&vec![Value::Int(1)], &handle(1)), Err(DbError::Unsupported(_))));
        assert!(matches!(
            idx.range(&vec![Value::Int(1)], &vec![Value::Int(2)]),
            Err(DbError::Unsupported(_))
        ));
    }
}
