pub mod catalog;
pub mod error;
pub mod index;
pub mod plan;
pub mod relation;
pub mod server;
pub mod sql;
pub mod storage;
pub mod types;
pub mod utils;

pub use crate::catalog::Catalog;
pub use crate::error::{DbError, DbResult};
pub use crate::server::{Config, Database};
pub use crate::sql::{Parser, QueryResult, SqlExec};
