use crate::plan::Conjunction;
use crate::types::{ColumnAttribute, DataType, Value};

use super::ast::Statement;

/// Echoes a canonical stringification of a parsed statement. Diagnostic
/// only: the REPL prints this before executing, so the user can see the
/// statement as the engine understood it.
pub fn canonical(stmt: &Statement) -> String {
    match stmt {
        Statement::CreateTable { table_name, if_not_exists, columns, primary_key } => {
            let cols = columns.iter().map(|(name, attr)| format!("{} {}", name, attribute_name(attr))).collect::<Vec<_>>().join(", ");
            let ine = if *if_not_exists { "IF NOT EXISTS " } else { "" };
            let pk = match primary_key {
                Some(cols) => format!(", PRIMARY KEY ({})", cols.join(", ")),
                None => String::new(),
            };
            format!("CREATE TABLE {}{} ({}{})", ine, table_name, cols, pk)
        }
        Statement::CreateIndex { index_name, table_name, columns } => {
            format!("CREATE INDEX {} ON {} ({})", index_name, table_name, columns.join(", "))
        }
        Statement::DropTable { table_name } => format!("DROP TABLE {}", table_name),
        Statement::DropIndex { table_name, index_name } => format!("DROP INDEX {} ON {}", index_name, table_name),
        Statement::ShowTables => "SHOW TABLES".to_string(),
        Statement::ShowColumns { table_name } => format!("SHOW COLUMNS FROM {}", table_name),
        Statement::ShowIndex { table_name } => format!("SHOW INDEX FROM {}", table_name),
        Statement::Insert { table_name, columns, values } => {
            let cols = match columns {
                Some(cols) => format!(" ({})", cols.join(", ")),
                None => String::new(),
            };
            let vals = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
            format!("INSERT INTO {}{} VALUES ({})", table_name, cols, vals)
        }
        Statement::Delete { table_name, predicate } => {
            format!("DELETE FROM {}{}", table_name, where_clause(predicate.as_ref()))
        }
        Statement::Select { table_name, columns, predicate } => {
            let cols = match columns {
                Some(cols) => cols.join(", "),
                None => "*".to_string(),
            };
            format!("SELECT {} FROM {}{}", cols, table_name, where_clause(predicate.as_ref()))
        }
    }
}

fn where_clause(predicate: Option<&Conjunction>) -> String {
    match predicate {
        None => String::new(),
        Some(conjunction) if conjunction.is_empty() => String::new(),
        Some(conjunction) => {
            let terms = conjunction.0.iter().map(|(c, v)| format!("{} = {}", c, v)).collect::<Vec<_>>().join(" AND ");
            format!(" WHERE {}", terms)
        }
    }
}

fn attribute_name(attr: &ColumnAttribute) -> String {
    match attr.data_type {
        DataType::Int => "INT".to_string(),
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Text => match attr.length {
            Some(n) => format!("TEXT({})", n),
            None => "TEXT".to_string(),
        },
    }
}
