use std::collections::HashMap;
use std::cmp::Ordering;

use crate::error::{DbError, DbResult};
use crate::storage::block_id::BlockId;

/// The three column types a table or index can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Text,
    Boolean,
}

/// A column's type together with, for `Text`, its declared maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAttribute {
    pub data_type: DataType,
    pub length: Option<u16>,
}

impl ColumnAttribute {
    pub fn int() -> Self {
        ColumnAttribute { data_type: DataType::Int, length: None }
    }

    pub fn text(length: u16) -> Self {
        ColumnAttribute { data_type: DataType::Text, length: Some(length) }
    }

    pub fn boolean() -> Self {
        ColumnAttribute { data_type: DataType::Boolean, length: None }
    }
}

/// A typed cell value. Comparison and equality across mismatched variants
/// is undefined and rejected by `compare`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
        }
    }

    pub fn as_int(&self) -> DbResult<i32> {
        match self {
            Value::Int(v) => Ok(*v),
            _ => Err(DbError::InvalidArgument(format!("{:?} is not an INT", self))),
        }
    }

    pub fn as_text(&self) -> DbResult<&str> {
        match self {
            Value::Text(v) => Ok(v),
            _ => Err(DbError::InvalidArgument(format!("{:?} is not TEXT", self))),
        }
    }

    pub fn as_boolean(&self) -> DbResult<bool> {
        match self {
            Value::Boolean(v) => Ok(*v),
            _ => Err(DbError::InvalidArgument(format!("{:?} is not BOOLEAN", self))),
        }
    }

    /// Orders two values of the same variant. Cross-type comparisons are a
    /// caller error, not something the executor can silently coerce.
    pub fn compare(&self, other: &Value) -> DbResult<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            _ => Err(DbError::InvalidArgument(format!(
                "cannot compare {:?} with {:?}",
                self, other
            ))),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "\"{}\"", v),
            Value::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// A row of named values, keyed by column name. This is the row format
/// produced by `select`/`project` and consumed by the executor and planner.
pub type ValueDict = HashMap<String, Value>;

/// A stable locator for one tuple: which block it lives in and which slot
/// within that block's slotted page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    pub block_id: BlockId,
    pub record_id: u16,
}

impl Handle {
    pub fn new(block_id: BlockId, record_id: u16) -> Self {
        Handle { block_id, record_id }
    }
}

/// A tuple of values used as a composite index key, positionally
/// corresponding to an index's declared key columns (not alphabetical).
pub type KeyValue = Vec<Value>;

/// The declared types of an index's key columns, in declaration order.
pub type KeyProfile = Vec<DataType>;
