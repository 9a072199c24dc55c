use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::DbResult;

use super::block_id::BlockId;

/// The block-addressable storage interface the heap file and B+Tree files
/// are built on. Anything that can read and write fixed-size blocks by
/// number, and append new ones, satisfies it. Block numbers are 1-based,
/// matching the RecordID convention used inside each block.
pub trait StorageMgr: Send + Sync {
    fn read(&self, blk: &BlockId, buf: &mut [u8]) -> DbResult<()>;
    fn write(&self, blk: &BlockId, buf: &[u8]) -> DbResult<()>;
    fn append(&self, filename: &str) -> DbResult<BlockId>;
    fn block_count(&self, filename: &str) -> DbResult<i32>;
    fn block_size(&self) -> usize;
    fn remove(&self, filename: &str) -> DbResult<()>;
}

/// Persists blocks as fixed-size slices of a regular file per relation.
pub struct FileStorageMgr {
    db_directory: PathBuf,
    block_size: usize,
    open_files: Mutex<HashMap<String, File>>,
}

impl FileStorageMgr {
    pub fn new(db_directory: impl AsRef<Path>, block_size: usize) -> DbResult<Self> {
        let db_directory = db_directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&db_directory)?;
        Ok(FileStorageMgr {
            db_directory,
            block_size,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    fn with_file<T>(&self, filename: &str, f: impl FnOnce(&mut File) -> DbResult<T>) -> DbResult<T> {
        let mut files = self.open_files.lock().unwrap();
        if !files.contains_key(filename) {
            let path = self.db_directory.join(filename);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?;
            files.insert(filename.to_string(), file);
        }
        let file = files.get_mut(filename).unwrap();
        f(file)
    }
}

impl StorageMgr for FileStorageMgr {
    fn read(&self, blk: &BlockId, buf: &mut [u8]) -> DbResult<()> {
        self.with_file(blk.filename(), |file| {
            file.seek(SeekFrom::Start(((blk.number() - 1) as u64) * self.block_size as u64))?;
            match file.read_exact(buf) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    buf.fill(0);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn write(&self, blk: &BlockId, buf: &[u8]) -> DbResult<()> {
        self.with_file(blk.filename(), |file| {
            file.seek(SeekFrom::Start(((blk.number() - 1) as u64) * self.block_size as u64))?;
            file.write_all(buf)?;
            file.flush()?;
            Ok(())
        })
    }

    fn append(&self, filename: &str) -> DbResult<BlockId> {
        let new_blk_num = self.block_count(filename)? + 1;
        let blk = BlockId::new(filename, new_blk_num);
        let zeros = vec![0u8; self.block_size];
        self.write(&blk, &zeros)?;
        log::debug!("appended block {} to {}", new_blk_num, filename);
        Ok(blk)
    }

    fn block_count(&self, filename: &str) -> DbResult<i32> {
        self.with_file(filename, |file| {
            let len = file.metadata()?.len();
            Ok((len / self.block_size as u64) as i32)
        })
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn remove(&self, filename: &str) -> DbResult<()> {
        let mut files = self.open_files.lock().unwrap();
        files.remove(filename);
        let path = self.db_directory.join(filename);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        log::info!("removed {}", filename);
        Ok(())
    }
}

/// An in-memory stand-in for `FileStorageMgr`, used by tests that don't
/// need blocks to survive the process.
pub struct MemStorageMgr {
    block_size: usize,
    files: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl MemStorageMgr {
    pub fn new(block_size: usize) -> Self {
        MemStorageMgr { block_size, files: Mutex::new(HashMap::new()) }
    }
}

impl StorageMgr for MemStorageMgr {
    fn read(&self, blk: &BlockId, buf: &mut [u8]) -> DbResult<()> {
        let files = self.files.lock().unwrap();
        if let Some(blocks) = files.get(blk.filename()) {
            if let Some(block) = blocks.get((blk.number() - 1) as usize) {
                buf.copy_from_slice(block);
                return Ok(());
            }
        }
        buf.fill(0);
        Ok(())
    }

    fn write(&self, blk: &BlockId, buf: &[u8]) -> DbResult<()> {
        let mut files = self.files.lock().unwrap();
        let blocks = files.entry(blk.filename().to_string()).or_default();
        let idx = (blk.number() - 1) as usize;
        if blocks.len() <= idx {
            blocks.resize(idx + 1, vec![0u8; self.block_size]);
        }
        blocks[idx] = buf.to_vec();
        Ok(())
    }

    fn append(&self, filename: &str) -> DbResult<BlockId> {
        let mut files = self.files.lock().unwrap();
        let blocks = files.entry(filename.to_string()).or_default();
        let blknum = blocks.len() as i32 + 1;
        blocks.push(vec![0u8; self.block_size]);
        Ok(BlockId::new(filename, blknum))
    }

    fn block_count(&self, filename: &str) -> DbResult<i32> {
        let files = self.files.lock().unwrap();
        Ok(files.get(filename).map(|b| b.len() as i32).unwrap_or(0))
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn remove(&self, filename: &str) -> DbResult<()> {
        self.files.lock().unwrap().remove(filename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trips_a_block() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = FileStorageMgr::new(dir.path(), 64).unwrap();
        let blk = mgr.append("t.tbl").unwrap();
        let mut data = vec![0u8; 64];
        data[0] = 42;
        mgr.write(&blk, &data).unwrap();
        let mut out = vec![0u8; 64];
        mgr.read(&blk, &mut out).unwrap();
        assert_eq!(out[0], 42);
        assert_eq!(mgr.block_count("t.tbl").unwrap(), 1);
    }

    #[test]
    fn mem_storage_round_trips_a_block() {
        let mgr = MemStorageMgr::new(64);
        let blk = mgr.append("t.tbl").unwrap();
        let mut data = vec![0u8; 64];
        data[3] = 9;
        mgr.write(&blk, &data).unwrap();
        let mut out = vec![0u8; 64];
        mgr.read(&blk, &mut out).unwrap();
        assert_eq!(out[3], 9);
    }
}
