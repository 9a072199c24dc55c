use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::index::btree::BTreeIndex;
use crate::index::{build_key_profile, DbIndex};
use crate::relation::{BTreeTable, DbRelation, HeapTable, Schema};
use crate::storage::StorageMgr;
use crate::types::{ColumnAttribute, DataType, Handle, Value, ValueDict};

pub const TABLES_TABLE: &str = "_tables";
pub const COLUMNS_TABLE: &str = "_columns";
pub const INDICES_TABLE: &str = "_indices";

pub fn is_schema_table(name: &str) -> bool {
    matches!(name, TABLES_TABLE | COLUMNS_TABLE | INDICES_TABLE)
}

fn tables_schema() -> Schema {
    let mut s = Schema::new();
    s.add_column("table_name", ColumnAttribute::text(64));
    s.add_column("storage_engine", ColumnAttribute::text(16));
    s
}

fn columns_schema() -> Schema {
    let mut s = Schema::new();
    s.add_column("table_name", ColumnAttribute::text(64));
    s.add_column("column_name", ColumnAttribute::text(64));
    s.add_column("data_type", ColumnAttribute::text(16));
    s.add_column("primary_key_seq", ColumnAttribute::int());
    s
}

fn indices_schema() -> Schema {
    let mut s = Schema::new();
    s.add_column("table_name", ColumnAttribute::text(64));
    s.add_column("index_name", ColumnAttribute::text(64));
    s.add_column("seq_in_index", ColumnAttribute::int());
    s.add_column("column_name", ColumnAttribute::text(64));
    s.add_column("index_type", ColumnAttribute::text(16));
    s.add_column("is_unique", ColumnAttribute::boolean());
    s
}

fn data_type_name(dt: DataType) -> &'static str {
    match dt {
        DataType::Int => "INT",
        DataType::Text => "TEXT",
        DataType::Boolean => "BOOLEAN",
    }
}

fn parse_data_type(s: &str) -> DbResult<DataType> {
    match s {
        "INT" => Ok(DataType::Int),
        "TEXT" => Ok(DataType::Text),
        "BOOLEAN" => Ok(DataType::Boolean),
        other => Err(DbError::Catalog(format!("unknown stored data type {}", other))),
    }
}

fn text_of(row: &ValueDict, col: &str) -> DbResult<String> {
    Ok(row
        .get(col)
        .ok_or_else(|| DbError::Catalog(format!("missing column {}", col)))?
        .as_text()?
        .to_string())
}

fn int_of(row: &ValueDict, col: &str) -> DbResult<i32> {
    row.get(col).ok_or_else(|| DbError::Catalog(format!("missing column {}", col)))?.as_int()
}

fn bool_of(row: &ValueDict, col: &str) -> DbResult<bool> {
    row.get(col).ok_or_else(|| DbError::Catalog(format!("missing column {}", col)))?.as_boolean()
}

/// Scans `relation`, returning every `(handle, row)` for which `filter`
/// holds. This is the catalog's only form of predicate evaluation: it
/// materialises handles via `select()` and checks each projected row in
/// Rust code, the same residual-filtering approach the executor uses.
fn scan_matching(
    relation: &dyn DbRelation,
    filter: impl Fn(&ValueDict) -> bool,
) -> DbResult<Vec<(Handle, ValueDict)>> {
    let mut out = Vec::new();
    for handle in relation.select()? {
        let row = relation.project(&handle, None)?;
        if filter(&row) {
            out.push((handle, row));
        }
    }
    Ok(out)
}

/// Description of one column as recorded in `_columns`, used while
/// building a table's in-memory `Schema`.
struct ColumnRow {
    column_name: String,
    data_type: DataType,
    primary_key_seq: i32,
}

/// The process-wide, self-describing schema catalog: `_tables`,
/// `_columns`, `_indices`, plus a live-object cache of the `DbRelation`s
/// and `DbIndex`es built from them.
pub struct Catalog {
    storage: Arc<dyn StorageMgr>,
    tables: HeapTable,
    columns: HeapTable,
    indices: HeapTable,
    relation_cache: HashMap<String, Box<dyn DbRelation>>,
    index_cache: HashMap<(String, String), Box<dyn DbIndex>>,
}

impl Catalog {
    pub fn new(storage: Arc<dyn StorageMgr>) -> DbResult<Self> {
        let mut tables = HeapTable::new(Arc::clone(&storage), TABLES_TABLE, tables_schema(), None);
        let mut columns = HeapTable::new(Arc::clone(&storage), COLUMNS_TABLE, columns_schema(), None);
        let mut indices = HeapTable::new(Arc::clone(&storage), INDICES_TABLE, indices_schema(), None);

        let cold_start = storage.block_count(&format!("{}.db", TABLES_TABLE))? == 0;
        tables.create_if_not_exists()?;
        columns.create_if_not_exists()?;
        indices.create_if_not_exists()?;

        let mut catalog = Catalog {
            storage,
            tables,
            columns,
            indices,
            relation_cache: HashMap::new(),
            index_cache: HashMap::new(),
        };

        if cold_start {
            catalog.seed_schema_tables()?;
        }
        Ok(catalog)
    }

    fn seed_schema_tables(&mut self) -> DbResult<()> {
        for name in [TABLES_TABLE, COLUMNS_TABLE, INDICES_TABLE] {
            self.insert_table_row(name, "HEAP")?;
        }
        self.insert_column_rows(TABLES_TABLE, &tables_schema(), &[])?;
        self.insert_column_rows(COLUMNS_TABLE, &columns_schema(), &[])?;
        self.insert_column_rows(INDICES_TABLE, &indices_schema(), &[])?;
        Ok(())
    }

    fn insert_table_row(&mut self, table_name: &str, storage_engine: &str) -> DbResult<Handle> {
        let mut row = ValueDict::new();
        row.insert("table_name".to_string(), Value::Text(table_name.to_string()));
        row.insert("storage_engine".to_string(), Value::Text(storage_engine.to_string()));
        self.tables.insert(&row)
    }

    fn insert_column_rows(
        &mut self,
        table_name: &str,
        schema: &Schema,
        primary_key: &[String],
    ) -> DbResult<Vec<Handle>> {
        let mut handles = Vec::new();
        for name in schema.columns() {
            let attr = schema.attribute(name)?;
            let seq = primary_key.iter().position(|k| k == name).map(|i| i as i32 + 1).unwrap_or(0);
            let mut row = ValueDict::new();
            row.insert("table_name".to_string(), Value::Text(table_name.to_string()));
            row.insert("column_name".to_string(), Value::Text(name.clone()));
            row.insert("data_type".to_string(), Value::Text(data_type_name(attr.data_type).to_string()));
            row.insert("primary_key_seq".to_string(), Value::Int(seq));
            handles.push(self.columns.insert(&row)?);
        }
        Ok(handles)
    }

    fn read_columns(&self, table_name: &str) -> DbResult<Vec<ColumnRow>> {
        let rows = scan_matching(&self.columns, |row| {
            text_of(row, "table_name").map(|t| t == table_name).unwrap_or(false)
        })?;
        rows.into_iter()
            .map(|(_, row)| {
                Ok(ColumnRow {
                    column_name: text_of(&row, "column_name")?,
                    data_type: parse_data_type(&text_of(&row, "data_type")?)?,
                    primary_key_seq: int_of(&row, "primary_key_seq")?,
                })
            })
            .collect()
    }

    fn build_schema(columns: &[ColumnRow]) -> Schema {
        let mut schema = Schema::new();
        for c in columns {
            let attr = match c.data_type {
                DataType::Int => ColumnAttribute::int(),
                DataType::Boolean => ColumnAttribute::boolean(),
                // _columns doesn't record declared text length; a generous
                // default is used since length only matters for catalog
                // presentation, not for marshal (which is length-prefixed).
                DataType::Text => ColumnAttribute::text(4096),
            };
            schema.add_column(c.column_name.clone(), attr);
        }
        schema
    }

    fn storage_engine_of(&self, table_name: &str) -> DbResult<String> {
        let rows = scan_matching(&self.tables, |row| {
            text_of(row, "table_name").map(|t| t == table_name).unwrap_or(false)
        })?;
        let (_, row) = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound(format!("table {} does not exist", table_name)))?;
        text_of(&row, "storage_engine")
    }

    fn build_relation(&self, table_name: &str) -> DbResult<Box<dyn DbRelation>> {
        let engine = self.storage_engine_of(table_name)?;
        let columns = self.read_columns(table_name)?;
        let mut primary_key: Vec<(&ColumnRow, i32)> =
            columns.iter().filter(|c| c.primary_key_seq > 0).map(|c| (c, c.primary_key_seq)).collect();
        primary_key.sort_by_key(|(_, seq)| *seq);
        let primary_key_names: Vec<String> = primary_key.into_iter().map(|(c, _)| c.column_name.clone()).collect();
        let schema = Self::build_schema(&columns);

        let mut relation: Box<dyn DbRelation> = if engine == "BTREE" {
            Box::new(BTreeTable::new(Arc::clone(&self.storage), table_name, schema, primary_key_names)?)
        } else {
            Box::new(HeapTable::new(Arc::clone(&self.storage), table_name, schema, None))
        };
        relation.open()?;
        Ok(relation)
    }

    /// Returns the cached relation for `table_name`, building and caching
    /// it on first use.
    pub fn get_table(&mut self, table_name: &str) -> DbResult<&mut Box<dyn DbRelation>> {
        if !self.relation_cache.contains_key(table_name) {
            let relation = self.build_relation(table_name)?;
            self.relation_cache.insert(table_name.to_string(), relation);
        }
        Ok(self.relation_cache.get_mut(table_name).unwrap())
    }

    fn invalidate_table(&mut self, table_name: &str) {
        self.relation_cache.remove(table_name);
    }

    /// The distinct index names on `table_name`, each with its columns in
    /// `seq_in_index` order.
    pub fn get_index_names(&self, table_name: &str) -> DbResult<Vec<String>> {
        let mut rows = scan_matching(&self.indices, |row| {
            text_of(row, "table_name").map(|t| t == table_name).unwrap_or(false)
        })?;
        rows.sort_by_key(|(_, row)| int_of(row, "seq_in_index").unwrap_or(0));
        let mut names = Vec::new();
        for (_, row) in rows {
            let name = text_of(&row, "index_name")?;
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn index_columns(&self, table_name: &str, index_name: &str) -> DbResult<Vec<String>> {
        let mut rows = scan_matching(&self.indices, |row| {
            text_of(row, "table_name").map(|t| t == table_name).unwrap_or(false)
                && text_of(row, "index_name").map(|n| n == index_name).unwrap_or(false)
        })?;
        rows.sort_by_key(|(_, row)| int_of(row, "seq_in_index").unwrap_or(0));
        rows.into_iter().map(|(_, row)| text_of(&row, "column_name")).collect()
    }

    fn build_index(&mut self, table_name: &str, index_name: &str) -> DbResult<Box<dyn DbIndex>> {
        let columns = self.index_columns(table_name, index_name)?;
        if columns.is_empty() {
            return Err(DbError::NotFound(format!("index {} on {} does not exist", index_name, table_name)));
        }
        let schema_columns = self.read_columns(table_name)?;
        let schema = Self::build_schema(&schema_columns);
        let profile = build_key_profile(&schema, &columns)?;
        let mut index = BTreeIndex::new(Arc::clone(&self.storage), table_name, index_name, columns, profile);
        index.open()?;
        Ok(Box::new(index))
    }

    pub fn get_index(&mut self, table_name: &str, index_name: &str) -> DbResult<&mut Box<dyn DbIndex>> {
        let key = (table_name.to_string(), index_name.to_string());
        if !self.index_cache.contains_key(&key) {
            let index = self.build_index(table_name, index_name)?;
            self.index_cache.insert(key.clone(), index);
        }
        Ok(self.index_cache.get_mut(&key).unwrap())
    }

    fn invalidate_index(&mut self, table_name: &str, index_name: &str) {
        self.index_cache.remove(&(table_name.to_string(), index_name.to_string()));
    }

    pub fn table_exists(&self, table_name: &str) -> DbResult<bool> {
        Ok(!scan_matching(&self.tables, |r| text_of(r, "table_name").map(|t| t == table_name).unwrap_or(false))?
            .is_empty())
    }

    /// Creates a user table: one `_tables` row, one `_columns` row per
    /// column, then the relation object itself. Any failure unwinds the
    /// catalog rows inserted so far, best-effort, before returning the
    /// original error.
    pub fn create_table(
        &mut self,
        table_name: &str,
        columns: Vec<(String, ColumnAttribute)>,
        primary_key: Option<Vec<String>>,
    ) -> DbResult<()> {
        if self.table_exists(table_name)? {
            return Err(DbError::SchemaViolation(format!("table {} already exists", table_name)));
        }
        let engine = if primary_key.is_some() { "BTREE" } else { "HEAP" };
        let table_handle = self.insert_table_row(table_name, engine)?;

        let mut schema = Schema::new();
        for (name, attr) in &columns {
            schema.add_column(name.clone(), *attr);
        }
        let pk = primary_key.clone().unwrap_or_default();
        let column_handles = match self.insert_column_rows(table_name, &schema, &pk) {
            Ok(h) => h,
            Err(e) => {
                let _ = self.tables.del(&table_handle);
                return Err(e);
            }
        };

        let result = (|| -> DbResult<()> {
            let mut relation: Box<dyn DbRelation> = if let Some(pk) = primary_key {
                Box::new(BTreeTable::new(Arc::clone(&self.storage), table_name, schema.clone(), pk)?)
            } else {
                Box::new(HeapTable::new(Arc::clone(&self.storage), table_name, schema.clone(), None))
            };
            relation.create()?;
            self.relation_cache.insert(table_name.to_string(), relation);
            Ok(())
        })();

        if let Err(e) = result {
            for h in &column_handles {
                let _ = self.columns.del(h);
            }
            let _ = self.tables.del(&table_handle);
            log::warn!("create_table {} failed and was rolled back: {}", table_name, e);
            return Err(e);
        }
        log::info!("created table {} ({} columns, engine {})", table_name, columns.len(), engine);
        Ok(())
    }

    /// Validates every listed column exists, records `_indices` rows,
    /// then allocates and bulk-builds the index from the table's current
    /// rows. Unwinds the `_indices` inserts on failure.
    pub fn create_index(&mut self, table_name: &str, index_name: &str, columns: Vec<String>) -> DbResult<()> {
        {
            let relation = self.get_table(table_name)?;
            for c in &columns {
                if !relation.column_names().contains(c) {
                    return Err(DbError::InvalidArgument(format!(
                        "column {} is not a column of {}",
                        c, table_name
                    )));
                }
            }
        }

        let mut handles = Vec::new();
        for (i, column_name) in columns.iter().enumerate() {
            let mut row = ValueDict::new();
            row.insert("table_name".to_string(), Value::Text(table_name.to_string()));
            row.insert("index_name".to_string(), Value::Text(index_name.to_string()));
            row.insert("seq_in_index".to_string(), Value::Int(i as i32 + 1));
            row.insert("column_name".to_string(), Value::Text(column_name.clone()));
            row.insert("index_type".to_string(), Value::Text("BTREE".to_string()));
            row.insert("is_unique".to_string(), Value::Boolean(true));
            match self.indices.insert(&row) {
                Ok(h) => handles.push(h),
                Err(e) => {
                    for h in &handles {
                        let _ = self.indices.del(h);
                    }
                    return Err(e);
                }
            }
        }

        let result = (|| -> DbResult<()> {
            let schema_columns = self.read_columns(table_name)?;
            let schema = Self::build_schema(&schema_columns);
            let profile = build_key_profile(&schema, &columns)?;
            let mut index = BTreeIndex::new(Arc::clone(&self.storage), table_name, index_name, columns.clone(), profile);
            index.create()?;
            let handles_and_keys: Vec<(Handle, Vec<Value>)> = {
                let relation = self.get_table(table_name)?;
                relation
                    .select()?
                    .into_iter()
                    .map(|h| {
                        let row = relation.project(&h, Some(&columns))?;
                        let key = columns.iter().map(|c| row.get(c).cloned().unwrap()).collect();
                        Ok((h, key))
                    })
                    .collect::<DbResult<Vec<_>>>()?
            };
            for (handle, key) in handles_and_keys {
                index.insert(&key, &handle)?;
            }
            self.index_cache.insert((table_name.to_string(), index_name.to_string()), Box::new(index));
            Ok(())
        })();

        if let Err(e) = result {
            for h in &handles {
                let _ = self.indices.del(h);
            }
            self.invalidate_index(table_name, index_name);
            log::warn!("create_index {} on {} failed and was rolled back: {}", index_name, table_name, e);
            return Err(e);
        }
        log::info!("created index {} on {} ({} columns)", index_name, table_name, columns.len());
        Ok(())
    }

    pub fn drop_table(&mut self, table_name: &str) -> DbResult<()> {
        if is_schema_table(table_name) {
            return Err(DbError::SchemaViolation(format!("cannot drop schema table {}", table_name)));
        }
        for index_name in self.get_index_names(table_name)? {
            self.drop_index(table_name, &index_name)?;
        }
        let column_rows = scan_matching(&self.columns, |r| {
            text_of(r, "table_name").map(|t| t == table_name).unwrap_or(false)
        })?;
        for (h, _) in &column_rows {
            self.columns.del(h)?;
        }
        {
            let relation = self.get_table(table_name)?;
            relation.drop_relation()?;
        }
        self.invalidate_table(table_name);
        let table_rows = scan_matching(&self.tables, |r| {
            text_of(r, "table_name").map(|t| t == table_name).unwrap_or(false)
        })?;
        for (h, _) in &table_rows {
            self.tables.del(h)?;
        }
        log::info!("dropped table {}", table_name);
        Ok(())
    }

    pub fn drop_index(&mut self, table_name: &str, index_name: &str) -> DbResult<()> {
        {
            let index = self.get_index(table_name, index_name)?;
            index.drop_index()?;
        }
        self.invalidate_index(table_name, index_name);
        let rows = scan_matching(&self.indices, |r| {
            text_of(r, "table_name").map(|t| t == table_name).unwrap_or(false)
                && text_of(r, "index_name").map(|n| n == index_name).unwrap_or(false)
        })?;
        for (h, _) in &rows {
            self.indices.del(h)?;
        }
        log::info!("dropped index {} on {}", index_name, table_name);
        Ok(())
    }

    /// Every user table, i.e. every `_tables` row except the three schema
    /// tables themselves.
    pub fn show_tables(&self) -> DbResult<Vec<ValueDict>> {
        let rows = scan_matching(&self.tables, |r| {
            text_of(r, "table_name").map(|t| !is_schema_table(&t)).unwrap_or(false)
        })?;
        Ok(rows.into_iter().map(|(_, r)| r).collect())
    }

    pub fn show_columns(&self, table_name: &str) -> DbResult<Vec<ValueDict>> {
        let rows = scan_matching(&self.columns, |r| {
            text_of(r, "table_name").map(|t| t == table_name).unwrap_or(false)
        })?;
        Ok(rows.into_iter().map(|(_, r)| r).collect())
    }

    pub fn show_index(&self, table_name: &str) -> DbResult<Vec<ValueDict>> {
        let rows = scan_matching(&self.indices, |r| {
            text_of(r, "table_name").map(|t| t == table_name).unwrap_or(false)
        })?;
        Ok(rows.into_iter().map(|(_, r)| r).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorageMgr;

    fn catalog() -> Catalog {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(1024));
        Catalog::new(storage).unwrap()
    }

    #[test]
    fn cold_start_seeds_schema_tables() {
        let catalog = catalog();
        let tables = catalog.show_tables().unwrap();
        assert!(tables.is_empty(), "schema tables must not appear in SHOW TABLES");
        let cols = catalog.show_columns(TABLES_TABLE).unwrap();
        assert_eq!(cols.len(), 2);
    }

    #[test]
    fn create_table_then_show_tables_and_columns() {
        let mut catalog = catalog();
        catalog
            .create_table(
                "foo",
                vec![("a".to_string(), ColumnAttribute::int()), ("b".to_string(), ColumnAttribute::text(10))],
                None,
            )
            .unwrap();
        let tables = catalog.show_tables().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(catalog.show_columns("foo").unwrap().len(), 2);
    }

    #[test]
    fn create_table_twice_is_rejected() {
        let mut catalog = catalog();
        catalog.create_table("foo", vec![("a".to_string(), ColumnAttribute::int())], None).unwrap();
        assert!(catalog.create_table("foo", vec![("a".to_string(), ColumnAttribute::int())], None).is_err());
    }

    #[test]
    fn drop_table_removes_catalog_rows() {
        let mut catalog = catalog();
        catalog.create_table("foo", vec![("a".to_string(), ColumnAttribute::int())], None).unwrap();
        catalog.drop_table("foo").unwrap();
        assert!(catalog.show_tables().unwrap().is_empty());
        assert!(catalog.show_columns("foo").unwrap().is_empty());
    }

    #[test]
    fn dropping_a_schema_table_is_forbidden() {
        let mut catalog = catalog();
        assert!(matches!(catalog.drop_table(TABLES_TABLE), Err(DbError::SchemaViolation(_))));
    }

    #[test]
    fn create_index_bulk_builds_from_existing_rows() {
        let mut catalog = catalog();
        catalog
            .create_table(
                "foo",
                vec![("a".to_string(), ColumnAttribute::int()), ("b".to_string(), ColumnAttribute::int())],
                None,
            )
            .unwrap();
        {
            let relation = catalog.get_table("foo").unwrap();
            let mut row = ValueDict::new();
            row.insert("a".to_string(), Value::Int(12));
            row.insert("b".to_string(), Value::Int(99));
            relation.insert(&row).unwrap();
        }
        catalog.create_index("foo", "a_idx", vec!["a".to_string()]).unwrap();
        let index = catalog.get_index("foo", "a_idx").unwrap();
        let handle = index.lookup(&vec![Value::Int(12)]).unwrap();
        assert!(handle.is_some());
    }
}
