use std::sync::Arc;

use crate::error::DbResult;

use super::block_id::BlockId;
use super::slotted_page::SlottedPage;
use super::storage_mgr::StorageMgr;

/// An ordered sequence of `SlottedPage`s identified by monotonically
/// assigned, 1-based block ids, backed by one file in the storage manager.
pub struct HeapFile {
    storage: Arc<dyn StorageMgr>,
    filename: String,
    last: i32,
}

impl HeapFile {
    /// Creates the underlying file and writes one empty `SlottedPage` as
    /// block 1.
    pub fn create(storage: Arc<dyn StorageMgr>, filename: impl Into<String>) -> DbResult<Self> {
        let filename = filename.into();
        let block_size = storage.block_size();
        let blk = storage.append(&filename)?;
        let page = SlottedPage::new_empty(block_size);
        storage.write(&blk, page.bytes())?;
        Ok(HeapFile { storage, filename, last: blk.number() })
    }

    /// Opens an existing file, recovering `last` from the storage
    /// manager's own block count.
    pub fn open(storage: Arc<dyn StorageMgr>, filename: impl Into<String>) -> DbResult<Self> {
        let filename = filename.into();
        let last = storage.block_count(&filename)?;
        Ok(HeapFile { storage, filename, last })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn last_block_num(&self) -> i32 {
        self.last
    }

    pub fn block_ids(&self) -> Vec<BlockId> {
        (1..=self.last).map(|n| BlockId::new(&self.filename, n)).collect()
    }

    pub fn get(&self, blk: &BlockId) -> DbResult<SlottedPage> {
        let mut buf = vec![0u8; self.storage.block_size()];
        self.storage.read(blk, &mut buf)?;
        Ok(SlottedPage::from_bytes(buf))
    }

    pub fn put(&self, blk: &BlockId, page: &SlottedPage) -> DbResult<()> {
        self.storage.write(blk, page.bytes())
    }

    /// Atomically allocates a new, empty block and returns it along with
    /// its id.
    pub fn get_new(&mut self) -> DbResult<(BlockId, SlottedPage)> {
        let blk = self.storage.append(&self.filename)?;
        self.last = blk.number();
        let page = SlottedPage::new_empty(self.storage.block_size());
        self.storage.write(&blk, page.bytes())?;
        Ok((blk, page))
    }

    pub fn block_id(&self, num: i32) -> BlockId {
        BlockId::new(&self.filename, num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::storage_mgr::MemStorageMgr;

    fn mgr() -> Arc<dyn StorageMgr> {
        Arc::new(MemStorageMgr::new(64))
    }

    #[test]
    fn create_allocates_block_one() {
        let heap = HeapFile::create(mgr(), "t.db").unwrap();
        assert_eq!(heap.last_block_num(), 1);
        assert_eq!(heap.block_ids(), vec![BlockId::new("t.db", 1)]);
    }

    #[test]
    fn get_new_grows_last_and_round_trips() {
        let storage = mgr();
        let mut heap = HeapFile::create(Arc::clone(&storage), "t.db").unwrap();
        let (blk, mut page) = heap.get_new().unwrap();
        assert_eq!(heap.last_block_num(), blk.number());
        page.add(b"hi").unwrap();
        heap.put(&blk, &page).unwrap();
        let reread = heap.get(&blk).unwrap();
        assert_eq!(reread.get(1).unwrap(), b"hi");
    }

    #[test]
    fn open_recovers_last_from_block_count() {
        let storage = mgr();
        {
            let mut heap = HeapFile::create(Arc::clone(&storage), "t.db").unwrap();
            heap.get_new().unwrap();
            heap.get_new().unwrap();
        }
        let heap = HeapFile::open(storage, "t.db").unwrap();
        assert_eq!(heap.last_block_num(), 3);
    }
}
