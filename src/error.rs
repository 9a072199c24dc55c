use thiserror::Error;

/// Error taxonomy for the storage engine and query executor.
///
/// `NoRoom` is locally recoverable: callers that get it back from a slotted
/// page or heap file operation are expected to retry against a different
/// block rather than treat it as fatal.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no room: {0}")]
    NoRoom(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
