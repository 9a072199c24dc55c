use std::path::{Path, PathBuf};

const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Configuration for file-based storage.
#[derive(Clone)]
pub struct FileStorageMgrConfig {
    pub db_directory: PathBuf,
    pub block_size: usize,
}

impl FileStorageMgrConfig {
    pub fn new<P: AsRef<Path>>(db_directory: P) -> Self {
        FileStorageMgrConfig { db_directory: db_directory.as_ref().to_path_buf(), block_size: DEFAULT_BLOCK_SIZE }
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

/// Configuration for in-memory storage, used by tests and `test` mode.
#[derive(Clone)]
pub struct MemStorageMgrConfig {
    pub block_size: usize,
}

impl MemStorageMgrConfig {
    pub fn new() -> Self {
        MemStorageMgrConfig { block_size: DEFAULT_BLOCK_SIZE }
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

#[derive(Clone)]
pub enum StorageMgrConfig {
    File(FileStorageMgrConfig),
    Mem(MemStorageMgrConfig),
}

impl StorageMgrConfig {
    pub fn file<P: AsRef<Path>>(db_directory: P) -> Self {
        StorageMgrConfig::File(FileStorageMgrConfig::new(db_directory))
    }

    pub fn mem() -> Self {
        StorageMgrConfig::Mem(MemStorageMgrConfig::new())
    }

    pub fn block_size(&self) -> usize {
        match self {
            StorageMgrConfig::File(c) => c.block_size,
            StorageMgrConfig::Mem(c) => c.block_size,
        }
    }
}

/// Top-level configuration for opening a `Database`.
#[derive(Clone)]
pub struct Config {
    pub storage_mgr: StorageMgrConfig,
}

impl Config {
    pub fn new(storage_mgr: StorageMgrConfig) -> Self {
        Config { storage_mgr }
    }

    pub fn file<P: AsRef<Path>>(db_directory: P) -> Self {
        Config::new(StorageMgrConfig::file(db_directory))
    }

    pub fn mem() -> Self {
        Config::new(StorageMgrConfig::mem())
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.storage_mgr = match self.storage_mgr {
            StorageMgrConfig::File(c) => StorageMgrConfig::File(c.block_size(block_size)),
            StorageMgrConfig::Mem(c) => StorageMgrConfig::Mem(c.block_size(block_size)),
        };
        self
    }
}
