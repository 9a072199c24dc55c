use sqlparser::ast::{
    CharacterLength, ColumnOption, DataType as SqlDataType, Expr as SqlExpr, SetExpr,
    Statement as SqlStatement, TableConstraint, TableFactor, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

use crate::error::{DbError, DbResult};
use crate::plan::Conjunction;
use crate::types::{ColumnAttribute, Value};

use super::ast::Statement;

const DEFAULT_TEXT_LENGTH: u16 = 4096;

/// Wraps `sqlparser`'s `GenericDialect` and translates its AST into this
/// crate's own `Statement`. A handful of forms `sqlparser` doesn't model
/// uniformly across dialects (`SHOW ... `, `DROP INDEX ... ON ...`) are
/// recognised by a small amount of manual tokenising before falling back
/// to the real parser.
pub struct Parser {
    dialect: GenericDialect,
}

impl Parser {
    pub fn new() -> Self {
        Parser { dialect: GenericDialect {} }
    }

    pub fn parse(&self, sql: &str) -> DbResult<Statement> {
        let trimmed = sql.trim();
        if let Some(stmt) = self.try_parse_show(trimmed)? {
            return Ok(stmt);
        }
        if let Some(stmt) = self.try_parse_drop_index(trimmed)? {
            return Ok(stmt);
        }

        let ast = SqlParser::parse_sql(&self.dialect, sql)
            .map_err(|e| DbError::InvalidArgument(format!("failed to parse SQL: {}", e)))?;
        let stmt = ast.into_iter().next().ok_or_else(|| DbError::InvalidArgument("empty SQL statement".to_string()))?;

        match stmt {
            SqlStatement::CreateTable(create_table) => self.parse_create_table(create_table),
            SqlStatement::CreateIndex(create_index) => self.parse_create_index(create_index),
            SqlStatement::Drop { object_type, names, .. } => {
                if !matches!(object_type, sqlparser::ast::ObjectType::Table) {
                    return Err(DbError::InvalidArgument("only DROP TABLE and DROP INDEX are supported".to_string()));
                }
                let table_name =
                    names.into_iter().next().ok_or_else(|| DbError::InvalidArgument("DROP TABLE needs a name".to_string()))?;
                Ok(Statement::DropTable { table_name: table_name.to_string() })
            }
            SqlStatement::Insert(insert) => self.parse_insert(insert),
            SqlStatement::Delete(delete) => self.parse_delete(delete),
            SqlStatement::Query(query) => self.parse_select(&query.body),
            other => Err(DbError::InvalidArgument(format!("unsupported SQL statement: {}", other))),
        }
    }

    fn try_parse_show(&self, sql: &str) -> DbResult<Option<Statement>> {
        let upper = sql.to_uppercase();
        if !upper.starts_with("SHOW") {
            return Ok(None);
        }
        let words: Vec<&str> = sql.split_whitespace().collect();
        match words.as_slice() {
            [_show, tables] if tables.eq_ignore_ascii_case("tables") => Ok(Some(Statement::ShowTables)),
            [_show, columns, _from, table] if columns.eq_ignore_ascii_case("columns") => {
                Ok(Some(Statement::ShowColumns { table_name: strip_semicolon(table) }))
            }
            [_show, index, _from, table] if index.eq_ignore_ascii_case("index") => {
                Ok(Some(Statement::ShowIndex { table_name: strip_semicolon(table) }))
            }
            _ => Err(DbError::InvalidArgument(format!("unsupported SHOW statement: {}", sql))),
        }
    }

    fn try_parse_drop_index(&self, sql: &str) -> DbResult<Option<Statement>> {
        let words: Vec<&str> = sql.split_whitespace().collect();
        match words.as_slice() {
            [drop, index, name, on, table] if drop.eq_ignore_ascii_case("drop") && index.eq_ignore_ascii_case("index") && on.eq_ignore_ascii_case("on") => {
                Ok(Some(Statement::DropIndex { table_name: strip_semicolon(table), index_name: strip_semicolon(name) }))
            }
            _ => Ok(None),
        }
    }

    fn parse_create_table(&self, create_table: sqlparser::ast::CreateTable) -> DbResult<Statement> {
        let table_name = create_table.name.to_string();
        let mut columns = Vec::new();
        let mut inline_primary_key = Vec::new();

        for col in &create_table.columns {
            let name = col.name.to_string();
            let attr = sql_data_type_to_attribute(&name, &col.data_type)?;
            columns.push((name.clone(), attr));
            for opt in &col.options {
                if let ColumnOption::Unique { is_primary: true, .. } = opt.option {
                    inline_primary_key.push(name.clone());
                }
            }
        }

        let mut primary_key = if inline_primary_key.is_empty() { None } else { Some(inline_primary_key) };
        for constraint in &create_table.constraints {
            if let TableConstraint::PrimaryKey { columns: cols, .. } = constraint {
                primary_key = Some(cols.iter().map(|c| c.to_string()).collect());
            }
        }

        Ok(Statement::CreateTable { table_name, if_not_exists: create_table.if_not_exists, columns, primary_key })
    }

    fn parse_create_index(&self, create_index: sqlparser::ast::CreateIndex) -> DbResult<Statement> {
        let index_name = create_index
            .name
            .ok_or_else(|| DbError::InvalidArgument("CREATE INDEX requires a name".to_string()))?
            .to_string();
        let table_name = create_index.table_name.to_string();
        if create_index.columns.is_empty() {
            return Err(DbError::InvalidArgument("CREATE INDEX requires at least one column".to_string()));
        }
        let columns = create_index.columns.iter().map(|c| c.to_string()).collect();
        Ok(Statement::CreateIndex { index_name, table_name, columns })
    }

    fn parse_insert(&self, insert: sqlparser::ast::Insert) -> DbResult<Statement> {
        let table_name = insert.table.to_string();
        let columns = if insert.columns.is_empty() {
            None
        } else {
            Some(insert.columns.iter().map(|c| c.value.clone()).collect())
        };
        let source =
            insert.source.ok_or_else(|| DbError::InvalidArgument("INSERT requires a VALUES clause".to_string()))?;
        let values = match *source.body {
            SetExpr::Values(values) => {
                let row = values
                    .rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| DbError::InvalidArgument("INSERT VALUES has no rows".to_string()))?;
                row.iter().map(sql_expr_to_value).collect::<DbResult<Vec<_>>>()?
            }
            _ => return Err(DbError::InvalidArgument("only INSERT ... VALUES is supported".to_string())),
        };
        Ok(Statement::Insert { table_name, columns, values })
    }

    fn parse_delete(&self, delete: sqlparser::ast::Delete) -> DbResult<Statement> {
        let table_name = match delete.from {
            sqlparser::ast::FromTable::WithFromKeyword(tables) | sqlparser::ast::FromTable::WithoutKeyword(tables) => {
                let table = tables.into_iter().next().ok_or_else(|| DbError::InvalidArgument("DELETE needs a table".to_string()))?;
                table_factor_name(&table.relation)?
            }
        };
        let predicate = delete.selection.as_ref().map(parse_conjunction).transpose()?;
        Ok(Statement::Delete { table_name, predicate })
    }

    fn parse_select(&self, query: &SetExpr) -> DbResult<Statement> {
        match query {
            SetExpr::Select(select) => {
                let table = select.from.first().ok_or_else(|| DbError::InvalidArgument("SELECT needs a FROM clause".to_string()))?;
                let table_name = table_factor_name(&table.relation)?;

                let is_star = select.projection.len() == 1
                    && matches!(select.projection[0], sqlparser::ast::SelectItem::Wildcard(_));
                let columns = if is_star {
                    None
                } else {
                    Some(
                        select
                            .projection
                            .iter()
                            .map(|item| match item {
                                sqlparser::ast::SelectItem::UnnamedExpr(SqlExpr::Identifier(ident)) => Ok(ident.value.clone()),
                                _ => Err(DbError::InvalidArgument("only bare column references are supported in SELECT".to_string())),
                            })
                            .collect::<DbResult<Vec<_>>>()?,
                    )
                };
                let predicate = select.selection.as_ref().map(parse_conjunction).transpose()?;
                Ok(Statement::Select { table_name, columns, predicate })
            }
            _ => Err(DbError::InvalidArgument("only simple SELECT statements are supported".to_string())),
        }
    }
}

fn strip_semicolon(s: &str) -> String {
    s.trim_end_matches(';').to_string()
}

fn table_factor_name(factor: &TableFactor) -> DbResult<String> {
    match factor {
        TableFactor::Table { name, .. } => Ok(name.to_string()),
        _ => Err(DbError::InvalidArgument("only simple table references are supported".to_string())),
    }
}

fn sql_data_type_to_attribute(column: &str, dt: &SqlDataType) -> DbResult<ColumnAttribute> {
    match dt {
        SqlDataType::Int(_) | SqlDataType::Integer(_) => Ok(ColumnAttribute::int()),
        SqlDataType::Boolean | SqlDataType::Bool => Ok(ColumnAttribute::boolean()),
        SqlDataType::Varchar(Some(CharacterLength::IntegerLength { length, .. })) => {
            Ok(ColumnAttribute::text(*length as u16))
        }
        SqlDataType::Varchar(None) | SqlDataType::Text => Ok(ColumnAttribute::text(DEFAULT_TEXT_LENGTH)),
        other => Err(DbError::InvalidArgument(format!("unsupported data type {:?} for column {}", other, column))),
    }
}

fn sql_expr_to_value(expr: &SqlExpr) -> DbResult<Value> {
    match expr {
        SqlExpr::Value(v) => sql_value_to_value(&v.value),
        SqlExpr::UnaryOp { op: sqlparser::ast::UnaryOperator::Minus, expr } => match &**expr {
            SqlExpr::Value(v) => match &v.value {
                SqlValue::Number(n, _) => {
                    let n: i32 = n.parse().map_err(|_| DbError::InvalidArgument(format!("invalid integer {}", n)))?;
                    Ok(Value::Int(-n))
                }
                _ => Err(DbError::InvalidArgument("unsupported literal".to_string())),
            },
            _ => Err(DbError::InvalidArgument("unsupported literal".to_string())),
        },
        _ => Err(DbError::InvalidArgument("only literal values are supported".to_string())),
    }
}

fn sql_value_to_value(v: &SqlValue) -> DbResult<Value> {
    match v {
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => Ok(Value::Text(s.clone())),
        SqlValue::Number(n, _) => {
            Ok(Value::Int(n.parse().map_err(|_| DbError::InvalidArgument(format!("invalid integer {}", n)))?))
        }
        SqlValue::Boolean(b) => Ok(Value::Boolean(*b)),
        other => Err(DbError::InvalidArgument(format!("unsupported literal {:?}", other))),
    }
}

fn parse_conjunction(expr: &SqlExpr) -> DbResult<Conjunction> {
    let mut conjunction = Conjunction::new();
    collect_conjunction(expr, &mut conjunction)?;
    Ok(conjunction)
}

fn collect_conjunction(expr: &SqlExpr, out: &mut Conjunction) -> DbResult<()> {
    match expr {
        SqlExpr::BinaryOp { left, op, right } => match op {
            sqlparser::ast::BinaryOperator::And => {
                collect_conjunction(left, out)?;
                collect_conjunction(right, out)
            }
            sqlparser::ast::BinaryOperator::Eq => {
                let column = match &**left {
                    SqlExpr::Identifier(ident) => ident.value.clone(),
                    _ => return Err(DbError::InvalidArgument("left side of = must be a column name".to_string())),
                };
                let value = sql_expr_to_value(right)?;
                out.push(column, value);
                Ok(())
            }
            _ => Err(DbError::InvalidArgument("only = and AND are supported in WHERE".to_string())),
        },
        _ => Err(DbError::InvalidArgument("unsupported expression in WHERE".to_string())),
    }
}
