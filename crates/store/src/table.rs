//! Table: slot-based row storage with secondary indexes
//!
//! A table owns four things that must stay in lock-step:
//! - the slot array, where a row's position is its stable storage handle
//! - the free list of tombstoned positions, reused LIFO by inserts
//! - the identifier counter (monotonic, never reused, even across deletes)
//! - the indexes: the implicit `_id` index plus any secondary indexes
//!
//! Every mutating operation resolves its predicate to positions first, then
//! applies the change and the matching index updates before returning, so
//! the index/data consistency invariants hold at every operation boundary.

use crate::index::{FieldIndex, IndexKey, Position};
use crate::query::{
    self, BuiltinOperator, OperatorArgs, OperatorFn, Predicate, OPERATOR_PREFIX,
};
use rustc_hash::FxHashMap;
use shale_core::{Document, Error, Result, RowId, Value, ID_FIELD};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Outcome of [`Table::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Rows matched and patched.
    pub updated: usize,
    /// Matched positions whose slot was unexpectedly empty.
    pub failed: usize,
}

/// Outcome of [`Table::delete`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Rows actually tombstoned.
    pub deleted: usize,
}

/// A single table of schemaless documents.
///
/// ```
/// use shale_store::{Predicate, Table};
/// use shale_core::Document;
///
/// let mut table = Table::new();
/// table.add_index("kind").unwrap();
///
/// let stored = table.create(Document::new().with("kind", "book"));
/// assert_eq!(stored.id(), Some(1));
///
/// let found = table.find(&Predicate::new().field("kind", "book")).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Debug)]
pub struct Table {
    slots: Vec<Option<Document>>,
    free: Vec<Position>,
    next_id: RowId,
    /// The implicit identifier index. Not part of `secondary`, so it can
    /// never be removed.
    primary: FieldIndex,
    secondary: FxHashMap<String, FieldIndex>,
    operators: query::OperatorTable,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Table {
            slots: Vec::new(),
            free: Vec::new(),
            next_id: 1,
            primary: FieldIndex::new(ID_FIELD),
            secondary: FxHashMap::default(),
            operators: query::OperatorTable::default(),
        }
    }

    /// Start building a table with initial rows and secondary indexes.
    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    /// Take the next identifier. Post-increments; never resets.
    fn generate_id(&mut self) -> RowId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Store a new row and return it, `_id` included.
    ///
    /// The identifier is always freshly assigned; any `_id` the caller put
    /// in `fields` is overwritten. The row lands on the most recently freed
    /// position, or on a new slot at the end when none is free.
    pub fn create(&mut self, fields: Document) -> Document {
        let id = self.generate_id();
        let mut row = fields;
        row.insert(ID_FIELD, id);

        let position = match self.free.pop() {
            Some(position) => position,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };

        if let Some(id_value) = row.get(ID_FIELD) {
            self.primary.insert(position, id_value);
        }
        for (field, index) in self.secondary.iter_mut() {
            if let Some(value) = row.get(field) {
                index.insert(position, value);
            }
        }

        trace!(target: "shale::table", id, position, "row stored");
        let stored = row.clone();
        self.slots[position] = Some(row);
        stored
    }

    /// Dereference a row by identifier through the `_id` index.
    pub fn get(&self, id: RowId) -> Option<&Document> {
        let bucket = self.primary.bucket(&IndexKey::Int(id as i64))?;
        let position = *bucket.first()?;
        self.slots.get(position)?.as_ref()
    }

    /// Rows matching the predicate, in ascending position order.
    pub fn find(&self, predicate: &Predicate) -> Result<Vec<Document>> {
        let positions = self.execute_query(predicate)?;
        Ok(positions
            .into_iter()
            .filter_map(|position| self.slots.get(position).and_then(|slot| slot.as_ref()))
            .cloned()
            .collect())
    }

    /// Merge `patch` over every row matching the predicate.
    ///
    /// The original `_id` always survives; a patch `_id` is ignored. Every
    /// patched field with a secondary index moves the row between buckets
    /// using the pre-patch value. A matched position whose slot is empty
    /// counts as `failed` rather than aborting the batch.
    pub fn update(&mut self, predicate: &Predicate, patch: &Document) -> Result<UpdateReport> {
        let positions = self.execute_query(predicate)?;
        let mut report = UpdateReport::default();

        for position in positions {
            let Some(row) = self.slots.get_mut(position).and_then(|slot| slot.as_mut()) else {
                report.failed += 1;
                continue;
            };
            for (field, value) in patch.iter() {
                if field == ID_FIELD {
                    continue;
                }
                let old = row.insert(field, value.clone());
                if let Some(index) = self.secondary.get_mut(field) {
                    index.update(position, old.as_ref(), value);
                }
            }
            report.updated += 1;
        }

        debug!(
            target: "shale::table",
            updated = report.updated,
            failed = report.failed,
            "update applied"
        );
        Ok(report)
    }

    /// Tombstone every row matching the predicate.
    ///
    /// Each deleted row's position joins the free list and leaves every
    /// index. Positions that turn out to be empty are skipped and omitted
    /// from the count.
    pub fn delete(&mut self, predicate: &Predicate) -> Result<DeleteReport> {
        let positions = self.execute_query(predicate)?;
        let matched = positions.len();
        let mut report = DeleteReport::default();

        for position in positions {
            let Some(row) = self.slots.get_mut(position).and_then(|slot| slot.take()) else {
                continue;
            };
            self.free.push(position);
            if let Some(id_value) = row.get(ID_FIELD) {
                self.primary.remove(position, id_value);
            }
            for (field, index) in self.secondary.iter_mut() {
                if let Some(value) = row.get(field) {
                    index.remove(position, value);
                }
            }
            report.deleted += 1;
        }

        debug!(
            target: "shale::table",
            matched,
            deleted = report.deleted,
            "delete applied"
        );
        Ok(report)
    }

    // ========================================================================
    // Query execution
    // ========================================================================

    /// Resolve a predicate to the set of matching positions.
    ///
    /// The empty predicate yields every live position. Otherwise terms are
    /// processed in insertion order, threading a candidate set: the first
    /// term seeds it (bucket lookup when the field is indexed, full scan
    /// when not), and every later term narrows it (bucket intersection when
    /// indexed, a re-check of only the surviving candidates when not — the
    /// whole table is never scanned twice).
    pub fn execute_query(&self, predicate: &Predicate) -> Result<BTreeSet<Position>> {
        if predicate.is_empty() {
            return Ok(query::live_positions(&self.slots));
        }

        let mut candidates: Option<BTreeSet<Position>> = None;
        for (key, value) in predicate.terms() {
            let found = match key.strip_prefix(OPERATOR_PREFIX) {
                Some(name) => self.apply_operator(name, value, candidates.as_ref())?,
                None => self.resolve_field(key, value, candidates.as_ref()),
            };
            candidates = Some(found);
        }
        Ok(candidates.unwrap_or_default())
    }

    /// One equality term: narrow `candidates` (or seed them) with
    /// `field == value`.
    fn resolve_field(
        &self,
        field: &str,
        value: &Value,
        candidates: Option<&BTreeSet<Position>>,
    ) -> BTreeSet<Position> {
        // Indexed path. Requires a value an index can hold; composites and
        // NaN fall through to the scan path so results never depend on
        // whether the field happens to be indexed.
        if let Some(key) = IndexKey::from_value(value) {
            if let Some(index) = self.index_for(field) {
                let bucket = index.bucket(&key);
                return match (candidates, bucket) {
                    (None, Some(bucket)) => bucket.clone(),
                    (Some(current), Some(bucket)) => {
                        current.intersection(bucket).copied().collect()
                    }
                    (_, None) => BTreeSet::new(),
                };
            }
        }

        match candidates {
            // First term: nothing to narrow, scan the whole slot array.
            None => self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| {
                    slot.as_ref()
                        .is_some_and(|row| row.get(field) == Some(value))
                })
                .map(|(position, _)| position)
                .collect(),
            // Later term: only re-check rows still in the running.
            Some(current) => current
                .iter()
                .copied()
                .filter(|&position| query::row_matches(&self.slots, position, field, value))
                .collect(),
        }
    }

    fn apply_operator(
        &self,
        name: &str,
        operand: &Value,
        candidates: Option<&BTreeSet<Position>>,
    ) -> Result<BTreeSet<Position>> {
        let args = OperatorArgs {
            slots: &self.slots,
            candidates,
            operand,
        };
        if let Some(builtin) = BuiltinOperator::from_name(name) {
            return builtin.apply(&args);
        }
        match self.operators.get(name) {
            Some(operator) => operator(&args),
            None => Err(Error::UnknownOperator(name.to_string())),
        }
    }

    /// Register an operator extension under its bare name (no `$`).
    ///
    /// Built-in operators shadow extensions of the same name. Registering
    /// the same name twice replaces the earlier function.
    pub fn register_operator(&mut self, name: impl Into<String>, operator: OperatorFn) {
        self.operators.insert(name.into(), operator);
    }

    // ========================================================================
    // Index management
    // ========================================================================

    fn index_for(&self, field: &str) -> Option<&FieldIndex> {
        if field == ID_FIELD {
            Some(&self.primary)
        } else {
            self.secondary.get(field)
        }
    }

    /// Create a secondary index on `field` and build it from current data.
    ///
    /// Fails with [`Error::IndexExists`] if the field is already indexed
    /// (`_id` always is).
    pub fn add_index(&mut self, field: impl Into<String>) -> Result<()> {
        let field = field.into();
        if self.is_indexed(&field) {
            return Err(Error::IndexExists(field));
        }
        let mut index = FieldIndex::new(field.clone());
        index.rebuild(&self.slots);
        debug!(
            target: "shale::table",
            field = %field,
            keys = index.len(),
            "secondary index built"
        );
        self.secondary.insert(field, index);
        Ok(())
    }

    /// Drop the secondary index on `field`.
    ///
    /// Fails with [`Error::ProtectedIndex`] for `_id` and
    /// [`Error::IndexNotFound`] for a field that has no index.
    pub fn remove_index(&mut self, field: &str) -> Result<()> {
        if field == ID_FIELD {
            return Err(Error::ProtectedIndex);
        }
        match self.secondary.remove(field) {
            Some(_) => {
                debug!(target: "shale::table", field = %field, "secondary index removed");
                Ok(())
            }
            None => Err(Error::IndexNotFound(field.to_string())),
        }
    }

    /// True if `field` has an index. `_id` always does.
    pub fn is_indexed(&self, field: &str) -> bool {
        field == ID_FIELD || self.secondary.contains_key(field)
    }

    /// Indexed field names, sorted; always includes `_id`.
    pub fn indexed_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.secondary.keys().map(String::as_str).collect();
        fields.push(ID_FIELD);
        fields.sort_unstable();
        fields
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// True if no rows are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slots, tombstones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Tombstoned positions awaiting reuse, in freed order (last entry is
    /// reused first).
    pub fn free_positions(&self) -> &[Position] {
        &self.free
    }
}

/// Builder for a table with initial rows and pre-declared indexes.
///
/// Initial rows must not carry an `_id`; bulk-loaded data never pre-assigns
/// identifiers. Rows fill slots in input order with no tombstones.
#[derive(Debug, Default)]
pub struct TableBuilder {
    rows: Vec<Document>,
    indexed: Vec<String>,
}

impl TableBuilder {
    /// Add one initial row.
    pub fn row(mut self, row: Document) -> Self {
        self.rows.push(row);
        self
    }

    /// Add initial rows in bulk.
    pub fn rows<I: IntoIterator<Item = Document>>(mut self, rows: I) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Request a secondary index on `field`. Duplicate requests (and
    /// `_id`, which is always indexed) are collapsed.
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.indexed.push(field.into());
        self
    }

    /// Build the table.
    ///
    /// Fails with [`Error::PreassignedId`] if any initial row already
    /// carries an `_id`; nothing is partially loaded on failure.
    pub fn build(self) -> Result<Table> {
        if self.rows.iter().any(|row| row.contains(ID_FIELD)) {
            return Err(Error::PreassignedId);
        }

        let mut table = Table::new();
        for row in self.rows {
            table.create(row);
        }
        for field in self.indexed {
            if table.is_indexed(&field) {
                continue;
            }
            table.add_index(field)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_monotonic_ids_from_one() {
        let mut table = Table::new();
        let a = table.create(Document::new().with("a", "x"));
        let b = table.create(Document::new().with("a", "y"));
        let c = table.create(Document::new());
        assert_eq!(a.id(), Some(1));
        assert_eq!(b.id(), Some(2));
        assert_eq!(c.id(), Some(3));
    }

    #[test]
    fn test_create_overwrites_caller_supplied_id() {
        let mut table = Table::new();
        let stored = table.create(Document::new().with(ID_FIELD, 999));
        assert_eq!(stored.id(), Some(1));
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let mut table = Table::new();
        table.create(Document::new().with("a", "x"));
        table
            .delete(&Predicate::new().field("a", "x"))
            .unwrap();
        let next = table.create(Document::new());
        assert_eq!(next.id(), Some(2));
    }

    #[test]
    fn test_get_by_id() {
        let mut table = Table::new();
        let stored = table.create(Document::new().with("a", "x"));
        let id = stored.id().unwrap();

        let row = table.get(id).unwrap();
        assert_eq!(row.get("a"), Some(&Value::String("x".to_string())));
        assert!(table.get(99).is_none());
    }

    #[test]
    fn test_len_counts_live_rows_only() {
        let mut table = Table::new();
        table.create(Document::new().with("a", "x"));
        table.create(Document::new().with("a", "y"));
        assert_eq!(table.len(), 2);

        table.delete(&Predicate::new().field("a", "x")).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.slot_count(), 2);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_builder_rejects_preassigned_id() {
        let err = Table::builder()
            .row(Document::new().with("a", "x"))
            .row(Document::new().with(ID_FIELD, 3))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::PreassignedId);
    }

    #[test]
    fn test_builder_loads_rows_and_indexes() {
        let table = Table::builder()
            .rows(vec![
                Document::new().with("a", "x"),
                Document::new().with("a", "y"),
            ])
            .index("a")
            .index("a") // duplicate request collapses
            .build()
            .unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.is_indexed("a"));
        assert!(table.free_positions().is_empty());
        assert_eq!(table.get(1).unwrap().get("a"), Some(&Value::from("x")));
    }

    #[test]
    fn test_add_index_twice_fails() {
        let mut table = Table::new();
        table.add_index("a").unwrap();
        assert_eq!(table.add_index("a").unwrap_err(), Error::IndexExists("a".to_string()));
    }

    #[test]
    fn test_add_index_on_id_fails() {
        let mut table = Table::new();
        assert_eq!(
            table.add_index(ID_FIELD).unwrap_err(),
            Error::IndexExists(ID_FIELD.to_string())
        );
    }

    #[test]
    fn test_remove_index_protects_id() {
        let mut table = Table::new();
        assert_eq!(table.remove_index(ID_FIELD).unwrap_err(), Error::ProtectedIndex);
        assert!(table.is_indexed(ID_FIELD));
    }

    #[test]
    fn test_remove_index_unknown_field_fails() {
        let mut table = Table::new();
        assert_eq!(
            table.remove_index("ghost").unwrap_err(),
            Error::IndexNotFound("ghost".to_string())
        );
    }

    #[test]
    fn test_indexed_fields_always_lists_id() {
        let mut table = Table::new();
        assert_eq!(table.indexed_fields(), vec![ID_FIELD]);
        table.add_index("b").unwrap();
        table.add_index("a").unwrap();
        assert_eq!(table.indexed_fields(), vec![ID_FIELD, "a", "b"]);
    }

    #[test]
    fn test_unknown_operator_fails() {
        let table = Table::new();
        let err = table
            .find(&Predicate::new().operator("gt", Value::Int(3)))
            .unwrap_err();
        assert_eq!(err, Error::UnknownOperator("gt".to_string()));
    }

    #[test]
    fn test_registered_operator_dispatches() {
        fn none(_args: &OperatorArgs<'_>) -> Result<BTreeSet<Position>> {
            Ok(BTreeSet::new())
        }

        let mut table = Table::new();
        table.create(Document::new().with("a", "x"));
        table.register_operator("none", none);

        let found = table
            .find(&Predicate::new().operator("none", Value::Null))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_builtin_eq_dispatches_through_executor() {
        let mut table = Table::new();
        table.create(Document::new().with("a", "x"));
        table.create(Document::new().with("a", "y"));

        let operand = Value::Object(std::collections::HashMap::from([(
            "a".to_string(),
            Value::from("x"),
        )]));
        let found = table
            .find(&Predicate::new().operator("eq", operand))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("a"), Some(&Value::from("x")));
    }

    #[test]
    fn test_find_by_id_uses_primary_index() {
        let mut table = Table::new();
        table.create(Document::new().with("a", "x"));
        table.create(Document::new().with("a", "y"));

        let found = table
            .find(&Predicate::new().field(ID_FIELD, 2))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("a"), Some(&Value::from("y")));
    }
}
