//! Secondary indexes for equality lookups
//!
//! A `FieldIndex` maps each distinct value of one field to the ordered set
//! of row positions currently holding that value. It turns an equality
//! probe from a full-table scan into a bucket lookup.
//!
//! Bucket keys are `IndexKey`s, not raw `Value`s: the enum discriminant is
//! the type tag, so `Int(5)` and `Str("5")` can never land in the same
//! bucket, and float keys are normalized so bucket lookup agrees with scan
//! equality. Values with no `IndexKey` (arrays, objects, NaN) are simply
//! never indexed; queries on them take the scan path.

use rustc_hash::FxHashMap;
use shale_core::{Document, Value};
use std::collections::BTreeSet;

/// Index of a row's slot in the table's slot array. Stable for the row's
/// lifetime; reused only after the row is deleted.
pub type Position = usize;

/// Serialized scalar used as an index bucket key.
///
/// Only scalars are indexable. `Float` stores normalized IEEE-754 bits:
/// `-0.0` maps to the `0.0` bucket (the two compare equal), and NaN has no
/// key at all (nothing compares equal to it, so a NaN bucket could never be
/// hit by a correct query).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Normalized IEEE-754 bit pattern of a finite or infinite float.
    Float(u64),
    /// String.
    Str(String),
}

impl IndexKey {
    /// Derive the bucket key for a value, or `None` for values no index
    /// can hold (composites and NaN).
    pub fn from_value(value: &Value) -> Option<IndexKey> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Int(i) => Some(IndexKey::Int(*i)),
            Value::Float(f) if f.is_nan() => None,
            // -0.0 == 0.0 under IEEE comparison but their bit patterns
            // differ; collapse to one bucket.
            Value::Float(f) if *f == 0.0 => Some(IndexKey::Float(0.0f64.to_bits())),
            Value::Float(f) => Some(IndexKey::Float(f.to_bits())),
            Value::String(s) => Some(IndexKey::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Value→positions index for one field.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    field: String,
    buckets: FxHashMap<IndexKey, BTreeSet<Position>>,
}

impl FieldIndex {
    /// Create an empty index for `field`.
    pub fn new(field: impl Into<String>) -> Self {
        FieldIndex {
            field: field.into(),
            buckets: FxHashMap::default(),
        }
    }

    /// The field this index covers.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Positions holding `value`, or `None` when the value has no bucket.
    ///
    /// Never fails; an absent value and an unindexable value both read as
    /// "no positions".
    pub fn get(&self, value: &Value) -> Option<&BTreeSet<Position>> {
        IndexKey::from_value(value).and_then(|key| self.buckets.get(&key))
    }

    /// Bucket lookup by pre-derived key, for callers that already hold one.
    pub fn bucket(&self, key: &IndexKey) -> Option<&BTreeSet<Position>> {
        self.buckets.get(key)
    }

    /// Record that the row at `position` holds `value`.
    ///
    /// Creates the bucket if absent. No-op for unindexable values.
    pub fn insert(&mut self, position: Position, value: &Value) {
        if let Some(key) = IndexKey::from_value(value) {
            self.buckets.entry(key).or_default().insert(position);
        }
    }

    /// Remove `position` from the bucket for `value`, if it is a member.
    ///
    /// No-op otherwise. Empty buckets are pruned so `get` on a drained
    /// value behaves like `get` on a value never indexed.
    pub fn remove(&mut self, position: Position, value: &Value) {
        let Some(key) = IndexKey::from_value(value) else {
            return;
        };
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(&position);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    /// Move `position` from the bucket for `old` to the bucket for `new`.
    ///
    /// The removal only takes effect if `position` is actually a member of
    /// the old bucket; the insert always happens. A row whose old value
    /// never made it into the index (absent field, composite, added before
    /// the index existed) still ends up indexed under its new value.
    pub fn update(&mut self, position: Position, old: Option<&Value>, new: &Value) {
        if let Some(old) = old {
            self.remove(position, old);
        }
        self.insert(position, new);
    }

    /// Rebuild from scratch over a slot array, in position order.
    ///
    /// Used when a secondary index is added to an already-populated table.
    pub fn rebuild(&mut self, slots: &[Option<Document>]) {
        self.buckets.clear();
        for (position, slot) in slots.iter().enumerate() {
            if let Some(row) = slot {
                if let Some(value) = row.get(&self.field) {
                    self.insert(position, value);
                }
            }
        }
    }

    /// Number of distinct indexed values.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
