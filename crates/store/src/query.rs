//! Predicate model and operator dispatch
//!
//! A predicate is a conjunction of terms applied in insertion order. A term
//! whose key starts with `$` names an operator instead of a field; operator
//! names resolve against a closed set of built-ins first, then against the
//! table's extension registry. Everything else is an exact-match equality
//! constraint on a field.

use crate::index::Position;
use rustc_hash::FxHashMap;
use shale_core::{Document, Error, Result, Value};
use std::collections::BTreeSet;

/// Reserved marker distinguishing operator keys from field names.
pub const OPERATOR_PREFIX: char = '$';

/// An exact-match conjunction query.
///
/// Terms are held in insertion order, and the executor processes them in
/// that order — for unindexed fields the first term pays a full scan and
/// every later term only re-checks surviving candidates, so putting the
/// most selective (or an indexed) term first is the cheap way to write a
/// query. Order never changes the result set.
///
/// ```
/// use shale_store::Predicate;
///
/// let q = Predicate::new().field("kind", "book").field("year", 1969);
/// assert_eq!(q.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, Value)>,
}

impl Predicate {
    /// The empty predicate, matching every live row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality constraint: `field == value`.
    pub fn field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }

    /// Add an operator term. `name` is the bare operator name, stored with
    /// the `$` marker: `.operator("eq", operand)` produces a `$eq` term.
    pub fn operator(mut self, name: &str, operand: impl Into<Value>) -> Self {
        self.terms
            .push((format!("{OPERATOR_PREFIX}{name}"), operand.into()));
        self
    }

    /// True if the predicate has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Iterate terms in insertion order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Predicate {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Predicate {
            terms: iter.into_iter().collect(),
        }
    }
}

/// What an operator sees when it runs.
pub struct OperatorArgs<'a> {
    /// The table's full slot array, tombstones included.
    pub slots: &'a [Option<Document>],
    /// Candidate positions surviving the terms processed so far, or `None`
    /// when this operator is the first term.
    pub candidates: Option<&'a BTreeSet<Position>>,
    /// The operand the predicate paired with the operator key.
    pub operand: &'a Value,
}

/// An operator extension: a pure function from the current query state to
/// the next candidate set.
pub type OperatorFn = fn(&OperatorArgs<'_>) -> Result<BTreeSet<Position>>;

/// Extension registry mapping bare operator names to their functions.
/// Built-ins shadow extensions of the same name.
pub(crate) type OperatorTable = FxHashMap<String, OperatorFn>;

/// The closed set of operators the executor ships with.
///
/// Range and logical combinators register through
/// [`Table::register_operator`](crate::Table::register_operator) without
/// touching the executor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOperator {
    /// `$eq`: the operand is an object of field/value pairs, each applied
    /// as an equality constraint.
    Eq,
}

impl BuiltinOperator {
    /// Resolve a bare operator name, e.g. `"eq"` for [`BuiltinOperator::Eq`].
    pub fn from_name(name: &str) -> Option<BuiltinOperator> {
        match name {
            "eq" => Some(BuiltinOperator::Eq),
            _ => None,
        }
    }

    /// The bare name this operator dispatches under.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinOperator::Eq => "eq",
        }
    }

    pub(crate) fn apply(self, args: &OperatorArgs<'_>) -> Result<BTreeSet<Position>> {
        match self {
            BuiltinOperator::Eq => eq(args),
        }
    }
}

/// `$eq` operator: equality constraints given as an object.
///
/// `{$eq: {a: 1, b: "x"}}` narrows the candidate set to rows where every
/// pair matches. An empty operand is vacuous and passes the candidate set
/// through (all live rows when it is the first term).
fn eq(args: &OperatorArgs<'_>) -> Result<BTreeSet<Position>> {
    let Value::Object(constraints) = args.operand else {
        return Err(Error::InvalidOperation(format!(
            "$eq expects an object of field/value pairs, got {}",
            args.operand.type_name()
        )));
    };

    let mut candidates = args.candidates.cloned();
    for (field, expected) in constraints {
        let next = match candidates {
            Some(current) => current
                .into_iter()
                .filter(|&position| row_matches(args.slots, position, field, expected))
                .collect(),
            None => args
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| {
                    slot.as_ref()
                        .is_some_and(|row| row.get(field) == Some(expected))
                })
                .map(|(position, _)| position)
                .collect(),
        };
        candidates = Some(next);
    }

    Ok(candidates.unwrap_or_else(|| live_positions(args.slots)))
}

/// True if the slot at `position` holds a live row whose `field` equals
/// `expected`.
pub(crate) fn row_matches(
    slots: &[Option<Document>],
    position: Position,
    field: &str,
    expected: &Value,
) -> bool {
    slots
        .get(position)
        .and_then(|slot| slot.as_ref())
        .is_some_and(|row| row.get(field) == Some(expected))
}

/// All live positions, ascending.
pub(crate) fn live_positions(slots: &[Option<Document>]) -> BTreeSet<Position> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(position, slot)| slot.as_ref().map(|_| position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots() -> Vec<Option<Document>> {
        vec![
            Some(Document::new().with("a", "x").with("n", 1)),
            None,
            Some(Document::new().with("a", "y").with("n", 1)),
            Some(Document::new().with("a", "x").with("n", 2)),
        ]
    }

    #[test]
    fn test_predicate_preserves_insertion_order() {
        let p = Predicate::new().field("b", 1).field("a", 2).field("c", 3);
        let keys: Vec<&str> = p.terms().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_predicate_operator_term_carries_marker() {
        let p = Predicate::new().operator("eq", Value::Object(Default::default()));
        let (key, _) = p.terms().next().unwrap();
        assert_eq!(key, "$eq");
    }

    #[test]
    fn test_builtin_from_name() {
        assert_eq!(BuiltinOperator::from_name("eq"), Some(BuiltinOperator::Eq));
        assert_eq!(BuiltinOperator::from_name("gt"), None);
        assert_eq!(BuiltinOperator::Eq.name(), "eq");
    }

    #[test]
    fn test_eq_seeds_from_full_scan() {
        let slots = slots();
        let operand = Value::Object(std::collections::HashMap::from([(
            "a".to_string(),
            Value::from("x"),
        )]));
        let args = OperatorArgs {
            slots: &slots,
            candidates: None,
            operand: &operand,
        };
        let found = eq(&args).unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_eq_narrows_existing_candidates() {
        let slots = slots();
        let current: BTreeSet<Position> = [0, 2].into_iter().collect();
        let operand = Value::Object(std::collections::HashMap::from([(
            "a".to_string(),
            Value::from("x"),
        )]));
        let args = OperatorArgs {
            slots: &slots,
            candidates: Some(&current),
            operand: &operand,
        };
        let found = eq(&args).unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_eq_conjoins_multiple_pairs() {
        let slots = slots();
        let operand = Value::Object(std::collections::HashMap::from([
            ("a".to_string(), Value::from("x")),
            ("n".to_string(), Value::Int(1)),
        ]));
        let args = OperatorArgs {
            slots: &slots,
            candidates: None,
            operand: &operand,
        };
        let found = eq(&args).unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_eq_empty_operand_is_vacuous() {
        let slots = slots();
        let operand = Value::Object(Default::default());
        let args = OperatorArgs {
            slots: &slots,
            candidates: None,
            operand: &operand,
        };
        let found = eq(&args).unwrap();
        // All live positions; the tombstone at 1 is excluded.
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_eq_rejects_non_object_operand() {
        let slots = slots();
        let operand = Value::Int(4);
        let args = OperatorArgs {
            slots: &slots,
            candidates: None,
            operand: &operand,
        };
        let err = eq(&args).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_live_positions_skips_tombstones() {
        let slots = slots();
        let live = live_positions(&slots);
        assert_eq!(live.into_iter().collect::<Vec<_>>(), vec![0, 2, 3]);
    }
}
