pub mod testing_utils;

pub use testing_utils::{temp_database, temp_database_with_cfg, TempDatabase};
