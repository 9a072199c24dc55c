pub mod block_id;
pub mod heap_file;
pub mod slotted_page;
pub mod storage_mgr;

pub use block_id::BlockId;
pub use heap_file::HeapFile;
pub use slotted_page::SlottedPage;
pub use storage_mgr::{FileStorageMgr, MemStorageMgr, StorageMgr};
