use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use crate::types::ColumnAttribute;

/// A table's declared columns, in the order they were created. Column
/// order drives both `marshal`'s byte layout and `SELECT *`'s output
/// order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<String>,
    attributes: HashMap<String, ColumnAttribute>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn add_column(&mut self, name: impl Into<String>, attr: ColumnAttribute) {
        let name = name.into();
        if !self.attributes.contains_key(&name) {
            self.columns.push(name.clone());
        }
        self.attributes.insert(name, attr);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute(&self, name: &str) -> DbResult<ColumnAttribute> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| DbError::InvalidArgument(format!("unknown column {}", name)))
    }

    pub fn attributes(&self, names: &[String]) -> DbResult<Vec<ColumnAttribute>> {
        names.iter().map(|n| self.attribute(n)).collect()
    }
}
