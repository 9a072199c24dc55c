use crate::plan::Conjunction;
use crate::types::{ColumnAttribute, Value};

/// The statement shapes `SqlExec` accepts, already resolved into the
/// engine's own types (no `sqlparser::ast` leaks past the parser module).
#[derive(Debug, Clone)]
pub enum Statement {
    CreateTable {
        table_name: String,
        if_not_exists: bool,
        columns: Vec<(String, ColumnAttribute)>,
        primary_key: Option<Vec<String>>,
    },
    CreateIndex {
        index_name: String,
        table_name: String,
        columns: Vec<String>,
    },
    DropTable {
        table_name: String,
    },
    DropIndex {
        table_name: String,
        index_name: String,
    },
    ShowTables,
    ShowColumns {
        table_name: String,
    },
    ShowIndex {
        table_name: String,
    },
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Value>,
    },
    Delete {
        table_name: String,
        predicate: Option<Conjunction>,
    },
    Select {
        table_name: String,
        columns: Option<Vec<String>>,
        predicate: Option<Conjunction>,
    },
}
