use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::types::{Handle, KeyValue, Value, ValueDict};

/// An ANDed list of `column = literal` conditions; the only predicate shape
/// the executor supports.
#[derive(Debug, Clone, Default)]
pub struct Conjunction(pub Vec<(String, Value)>);

impl Conjunction {
    pub fn new() -> Self {
        Conjunction(Vec::new())
    }

    pub fn push(&mut self, column: String, value: Value) {
        self.0.push((column, value));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value_for(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// True iff `row` satisfies every condition.
    pub fn matches(&self, row: &ValueDict) -> DbResult<bool> {
        for (column, value) in &self.0 {
            let actual = row
                .get(column)
                .ok_or_else(|| DbError::InvalidArgument(format!("unknown column {} in WHERE clause", column)))?;
            if actual.compare(value)? != std::cmp::Ordering::Equal {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Splits off the conditions naming `columns`, in `columns`' order, from
    /// the remaining ("residual") conditions. Returns `None` if any of
    /// `columns` has no equality condition in this conjunction.
    fn extract(&self, columns: &[String]) -> Option<(KeyValue, Conjunction)> {
        let mut key = Vec::with_capacity(columns.len());
        for c in columns {
            key.push(self.value_for(c)?.clone());
        }
        let residual = Conjunction(self.0.iter().filter(|(c, _)| !columns.contains(c)).cloned().collect());
        Some((key, residual))
    }
}

/// A plan tree: `TableScan`/`Select`/`IndexLookup` produce handles via
/// `pipeline()`; `Project`/`ProjectAll` are the only nodes `evaluate()`
/// accepts, and read values for those handles.
pub enum PlanNode {
    TableScan(String),
    Select(Conjunction, Box<PlanNode>),
    IndexLookup { table: String, index: String, key: KeyValue, residual: Conjunction },
    /// `None` columns means `SELECT *` (ProjectAll).
    Project(Option<Vec<String>>, Box<PlanNode>),
}

impl PlanNode {
    /// Runs every non-`Project` node, returning the handles it selects
    /// together with the name of the table they belong to.
    pub fn pipeline(&self, catalog: &mut Catalog) -> DbResult<(String, Vec<Handle>)> {
        match self {
            PlanNode::TableScan(table) => {
                let handles = catalog.get_table(table)?.select()?;
                Ok((table.clone(), handles))
            }
            PlanNode::Select(predicate, child) => {
                let (table, handles) = child.pipeline(catalog)?;
                let mut kept = Vec::new();
                for handle in handles {
                    let row = catalog.get_table(&table)?.project(&handle, None)?;
                    if predicate.matches(&row)? {
                        kept.push(handle);
                    }
                }
                Ok((table, kept))
            }
            PlanNode::IndexLookup { table, index, key, residual } => {
                let found = catalog.get_index(table, index)?.lookup(key)?;
                let mut handles: Vec<Handle> = found.into_iter().collect();
                if !residual.is_empty() {
                    let mut kept = Vec::new();
                    for handle in handles {
                        let row = catalog.get_table(table)?.project(&handle, None)?;
                        if residual.matches(&row)? {
                            kept.push(handle);
                        }
                    }
                    handles = kept;
                }
                Ok((table.clone(), handles))
            }
            PlanNode::Project(..) => Err(DbError::InvalidArgument("pipeline is only valid on non-Project nodes".to_string())),
        }
    }

    /// Valid only on a terminal `Project`/`ProjectAll` node.
    pub fn evaluate(&self, catalog: &mut Catalog) -> DbResult<Vec<ValueDict>> {
        match self {
            PlanNode::Project(cols, child) => {
                let (table, handles) = child.pipeline(catalog)?;
                handles
                    .iter()
                    .map(|h| catalog.get_table(&table)?.project(h, cols.as_deref()))
                    .collect()
            }
            _ => Err(DbError::InvalidArgument("Invalid evaluation plan".to_string())),
        }
    }
}

/// The one optimisation rule: rewrite `Select(conjunction, TableScan(t))`
/// into an `IndexLookup` when some index on `t` has an equality condition
/// for *every* one of its key columns in the conjunction (a partial match
/// cannot drive a unique-index lookup, which needs the full key). Any
/// condition not absorbed into the key stays behind as a residual filter
/// applied above the lookup.
pub fn optimize(node: PlanNode, catalog: &mut Catalog) -> DbResult<PlanNode> {
    match node {
        PlanNode::Select(predicate, child) => {
            let child = optimize(*child, catalog)?;
            if let PlanNode::TableScan(table) = &child {
                for index_name in catalog.get_index_names(table)? {
                    let key_columns = catalog.get_index(table, &index_name)?.key_columns().to_vec();
                    if let Some((key, residual)) = predicate.extract(&key_columns) {
                        return Ok(PlanNode::IndexLookup { table: table.clone(), index: index_name, key, residual });
                    }
                }
            }
            Ok(PlanNode::Select(predicate, Box::new(child)))
        }
        PlanNode::Project(cols, child) => Ok(PlanNode::Project(cols, Box::new(optimize(*child, catalog)?))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::storage::MemStorageMgr;
    use crate::storage::StorageMgr;
    use crate::types::ColumnAttribute;

    fn catalog() -> Catalog {
        let storage: Arc<dyn StorageMgr> = Arc::new(MemStorageMgr::new(1024));
        Catalog::new(storage).unwrap()
    }

    fn row(a: i32, b: i32) -> ValueDict {
        let mut r = ValueDict::new();
        r.insert("a".to_string(), Value::Int(a));
        r.insert("b".to_string(), Value::Int(b));
        r
    }

    #[test]
    fn table_scan_pipeline_returns_every_row() {
        let mut catalog = catalog();
        catalog
            .create_table("foo", vec![("a".to_string(), ColumnAttribute::int()), ("b".to_string(), ColumnAttribute::int())], None)
            .unwrap();
        catalog.get_table("foo").unwrap().insert(&row(1, 2)).unwrap();
        catalog.get_table("foo").unwrap().insert(&row(3, 4)).unwrap();
        let (table, handles) = PlanNode::TableScan("foo".to_string()).pipeline(&mut catalog).unwrap();
        assert_eq!(table, "foo");
        assert_eq!(handles.len(), 2);
    }

    #[test]
    fn select_filters_by_predicate() {
        let mut catalog = catalog();
        catalog
            .create_table("foo", vec![("a".to_string(), ColumnAttribute::int()), ("b".to_string(), ColumnAttribute::int())], None)
            .unwrap();
        catalog.get_table("foo").unwrap().insert(&row(1, 2)).unwrap();
        catalog.get_table("foo").unwrap().insert(&row(3, 4)).unwrap();
        let mut pred = Conjunction::new();
        pred.push("a".to_string(), Value::Int(3));
        let node = PlanNode::Select(pred, Box::new(PlanNode::TableScan("foo".to_string())));
        let (_, handles) = node.pipeline(&mut catalog).unwrap();
        assert_eq!(handles.len(), 1);
    }

    #[test]
    fn optimizer_rewrites_full_key_match_into_index_lookup() {
        let mut catalog = catalog();
        catalog
            .create_table("foo", vec![("a".to_string(), ColumnAttribute::int()), ("b".to_string(), ColumnAttribute::int())], None)
            .unwrap();
        catalog.get_table("foo").unwrap().insert(&row(500, -400)).unwrap();
        catalog.create_index("foo", "a_idx", vec!["a".to_string()]).unwrap();

        let mut pred = Conjunction::new();
        pred.push("a".to_string(), Value::Int(500));
        let node = PlanNode::Project(
            Some(vec!["a".to_string(), "b".to_string()]),
            Box::new(PlanNode::Select(pred, Box::new(PlanNode::TableScan("foo".to_string())))),
        );
        let optimized = optimize(node, &mut catalog).unwrap();
        match &optimized {
            PlanNode::Project(_, child) => assert!(matches!(**child, PlanNode::IndexLookup { .. })),
            _ => panic!("expected Project"),
        }
        let rows = optimized.evaluate(&mut catalog).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("b"), Some(&Value::Int(-400)));
    }

    #[test]
    fn residual_predicate_applies_above_index_lookup() {
        let mut catalog = catalog();
        catalog
            .create_table("foo", vec![("a".to_string(), ColumnAttribute::int()), ("b".to_string(), ColumnAttribute::int())], None)
            .unwrap();
        catalog.get_table("foo").unwrap().insert(&row(500, -400)).unwrap();
        catalog.create_index("foo", "a_idx", vec!["a".to_string()]).unwrap();

        let mut pred = Conjunction::new();
        pred.push("a".to_string(), Value::Int(500));
        pred.push("b".to_string(), Value::Int(1));
        let node = PlanNode::Select(pred, Box::new(PlanNode::TableScan("foo".to_string())));
        let optimized = optimize(node, &mut catalog).unwrap();
        let (_, handles) = optimized.pipeline(&mut catalog).unwrap();
        assert!(handles.is_empty(), "residual b = 1 condition should exclude the only row");
    }
}
