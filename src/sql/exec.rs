use crate::catalog::{is_schema_table, Catalog};
use crate::error::{DbError, DbResult};
use crate::index::DbIndex;
use crate::plan::{optimize, Conjunction, PlanNode};
use crate::relation::DbRelation;
use crate::types::{Value, ValueDict};

use super::ast::Statement;

/// The outcome of executing one statement: either a free-form status
/// message (DDL, INSERT, DELETE) or a result set (SELECT, SHOW).
#[derive(Debug, Clone)]
pub enum QueryResult {
    Message(String),
    Rows { columns: Vec<String>, rows: Vec<ValueDict> },
}

impl std::fmt::Display for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryResult::Message(m) => write!(f, "{}", m),
            QueryResult::Rows { columns, rows } => {
                writeln!(f, "{}", columns.join(" | "))?;
                for row in rows {
                    let cells: Vec<String> =
                        columns.iter().map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default()).collect();
                    writeln!(f, "{}", cells.join(" | "))?;
                }
                write!(f, "({} row(s))", rows.len())
            }
        }
    }
}

/// Translates a parsed `Statement` into catalog mutations and plan trees,
/// per the statement dispatch table.
pub struct SqlExec;

impl SqlExec {
    pub fn execute(catalog: &mut Catalog, stmt: &Statement) -> DbResult<QueryResult> {
        log::debug!("executing {:?}", stmt);
        match stmt {
            Statement::CreateTable { table_name, if_not_exists, columns, primary_key } => {
                if *if_not_exists && catalog.table_exists(table_name)? {
                    return Ok(QueryResult::Message(format!("table {} already exists, skipped", table_name)));
                }
                catalog.create_table(table_name, columns.clone(), primary_key.clone())?;
                Ok(QueryResult::Message(format!("table {} created", table_name)))
            }
            Statement::CreateIndex { index_name, table_name, columns } => {
                catalog.create_index(table_name, index_name, columns.clone())?;
                Ok(QueryResult::Message(format!("index {} created on {}", index_name, table_name)))
            }
            Statement::DropTable { table_name } => {
                catalog.drop_table(table_name)?;
                Ok(QueryResult::Message(format!("table {} dropped", table_name)))
            }
            Statement::DropIndex { table_name, index_name } => {
                catalog.drop_index(table_name, index_name)?;
                Ok(QueryResult::Message(format!("index {} dropped", index_name)))
            }
            Statement::ShowTables => {
                let rows = catalog.show_tables()?;
                Ok(QueryResult::Rows { columns: vec!["table_name".to_string(), "storage_engine".to_string()], rows })
            }
            Statement::ShowColumns { table_name } => {
                let rows = catalog.show_columns(table_name)?;
                Ok(QueryResult::Rows {
                    columns: vec![
                        "table_name".to_string(),
                        "column_name".to_string(),
                        "data_type".to_string(),
                        "primary_key_seq".to_string(),
                    ],
                    rows,
                })
            }
            Statement::ShowIndex { table_name } => {
                let rows = catalog.show_index(table_name)?;
                Ok(QueryResult::Rows {
                    columns: vec![
                        "table_name".to_string(),
                        "index_name".to_string(),
                        "seq_in_index".to_string(),
                        "column_name".to_string(),
                        "index_type".to_string(),
                        "is_unique".to_string(),
                    ],
                    rows,
                })
            }
            Statement::Insert { table_name, columns, values } => Self::execute_insert(catalog, table_name, columns.as_deref(), values),
            Statement::Delete { table_name, predicate } => Self::execute_delete(catalog, table_name, predicate.clone()),
            Statement::Select { table_name, columns, predicate } => Self::execute_select(catalog, table_name, columns.clone(), predicate.clone()),
        }
    }

    fn execute_insert(catalog: &mut Catalog, table_name: &str, columns: Option<&[String]>, values: &[Value]) -> DbResult<QueryResult> {
        if is_schema_table(table_name) {
            return Err(DbError::SchemaViolation(format!("cannot insert into schema table {}", table_name)));
        }
        let target_columns: Vec<String> = match columns {
            Some(cols) => cols.to_vec(),
            None => catalog.get_table(table_name)?.column_names().to_vec(),
        };
        if target_columns.len() != values.len() {
            return Err(DbError::InvalidArgument(format!(
                "{} columns named but {} values given",
                target_columns.len(),
                values.len()
            )));
        }
        let mut row = ValueDict::new();
        for (name, value) in target_columns.iter().zip(values.iter()) {
            row.insert(name.clone(), value.clone());
        }

        let index_names = catalog.get_index_names(table_name)?;
        let handle = catalog.get_table(table_name)?.insert(&row)?;
        for index_name in index_names {
            let key_columns = catalog.get_index(table_name, &index_name)?.key_columns().to_vec();
            let key = key_columns
                .iter()
                .map(|c| row.get(c).cloned().ok_or_else(|| DbError::InvalidArgument(format!("missing value for indexed column {}", c))))
                .collect::<DbResult<Vec<_>>>()?;
            catalog.get_index(table_name, &index_name)?.insert(&key, &handle)?;
        }
        Ok(QueryResult::Message("1 row(s) inserted".to_string()))
    }

    fn execute_delete(catalog: &mut Catalog, table_name: &str, predicate: Option<Conjunction>) -> DbResult<QueryResult> {
        if is_schema_table(table_name) {
            return Err(DbError::SchemaViolation(format!("cannot delete from schema table {}", table_name)));
        }
        let scan = PlanNode::TableScan(table_name.to_string());
        let plan = match predicate {
            Some(p) => PlanNode::Select(p, Box::new(scan)),
            None => scan,
        };
        let plan = optimize(plan, catalog)?;
        let (table, handles) = plan.pipeline(catalog)?;

        let index_names = catalog.get_index_names(&table)?;
        let count = handles.len();
        for handle in &handles {
            let row = catalog.get_table(&table)?.project(handle, None)?;
            for index_name in &index_names {
                let key_columns = catalog.get_index(&table, index_name)?.key_columns().to_vec();
                let key: Vec<Value> = key_columns.iter().map(|c| row.get(c).cloned().unwrap()).collect();
                catalog.get_index(&table, index_name)?.del(&key, handle)?;
            }
            catalog.get_table(&table)?.del(handle)?;
        }
        Ok(QueryResult::Message(format!("{} row(s) deleted", count)))
    }

    fn execute_select(
        catalog: &mut Catalog,
        table_name: &str,
        columns: Option<Vec<String>>,
        predicate: Option<Conjunction>,
    ) -> DbResult<QueryResult> {
        let scan = PlanNode::TableScan(table_name.to_string());
        let filtered = match predicate {
            Some(p) => PlanNode::Select(p, Box::new(scan)),
            None => scan,
        };
        let output_columns = match &columns {
            Some(cols) => cols.clone(),
            None => catalog.get_table(table_name)?.column_names().to_vec(),
        };
        let plan = PlanNode::Project(columns, Box::new(filtered));
        let plan = optimize(plan, catalog)?;
        let rows = plan.evaluate(catalog)?;
        Ok(QueryResult::Rows { columns: output_columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::sql::parser::Parser;
    use crate::storage::{MemStorageMgr, StorageMgr};

    fn catalog() -> Catalog {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(1024));
        Catalog::new(storage).unwrap()
    }

    fn run(catalog: &mut Catalog, parser: &Parser, sql: &str) -> DbResult<QueryResult> {
        let stmt = parser.parse(sql)?;
        SqlExec::execute(catalog, &stmt)
    }

    #[test]
    fn round_trip_insert_and_select() {
        let mut catalog = catalog();
        let parser = Parser::new();
        run(&mut catalog, &parser, "CREATE TABLE foo (a INT, b TEXT)").unwrap();
        run(&mut catalog, &parser, "INSERT INTO foo VALUES (1, 'hello')").unwrap();
        let result = run(&mut catalog, &parser, "SELECT * FROM foo").unwrap();
        match result {
            QueryResult::Rows { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("a"), Some(&Value::Int(1)));
                assert_eq!(rows[0].get("b"), Some(&Value::Text("hello".to_string())));
            }
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn index_driven_select_returns_exact_row() {
        let mut catalog = catalog();
        let parser = Parser::new();
        run(&mut catalog, &parser, "CREATE TABLE foo (a INT, b INT)").unwrap();
        run(&mut catalog, &parser, "INSERT INTO foo VALUES (12, 99)").unwrap();
        run(&mut catalog, &parser, "INSERT INTO foo VALUES (88, 101)").unwrap();
        for i in 0..1000 {
            run(&mut catalog, &parser, &format!("INSERT INTO foo VALUES ({}, {})", 100 + i, -i)).unwrap();
        }
        run(&mut catalog, &parser, "CREATE INDEX a_idx ON foo (a)").unwrap();
        let result = run(&mut catalog, &parser, "SELECT a, b FROM foo WHERE a = 500").unwrap();
        match result {
            QueryResult::Rows { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("a"), Some(&Value::Int(500)));
                assert_eq!(rows[0].get("b"), Some(&Value::Int(-400)));
            }
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn delete_removes_row_and_index_entry() {
        let mut catalog = catalog();
        let parser = Parser::new();
        run(&mut catalog, &parser, "CREATE TABLE foo (a INT, b INT)").unwrap();
        run(&mut catalog, &parser, "INSERT INTO foo VALUES (1, 2)").unwrap();
        run(&mut catalog, &parser, "DELETE FROM foo WHERE a = 1").unwrap();
        let result = run(&mut catalog, &parser, "SELECT * FROM foo").unwrap();
        match result {
            QueryResult::Rows { rows, .. } => assert!(rows.is_empty()),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn show_tables_excludes_schema_tables() {
        let mut catalog = catalog();
        let parser = Parser::new();
        run(&mut catalog, &parser, "CREATE TABLE foo (a INT)").unwrap();
        let result = run(&mut catalog, &parser, "SHOW TABLES").unwrap();
        match result {
            QueryResult::Rows { rows, .. } => assert_eq!(rows.len(), 1),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn create_table_rolls_back_on_duplicate_primary_key_column() {
        let mut catalog = catalog();
        let parser = Parser::new();
        run(&mut catalog, &parser, "CREATE TABLE foo (a INT, b INT)").unwrap();
        assert!(run(&mut catalog, &parser, "CREATE TABLE foo (a INT)").is_err());
        assert_eq!(catalog.show_columns("foo").unwrap().len(), 2);
    }
}
