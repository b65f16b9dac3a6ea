//! Abstract query IR: conditions, order keys, page bounds.

use crate::entity::FieldRead;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether the predicate compiler honors per-field search kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Equality for every field, overriding per-field search kinds.
    /// Used for uniqueness lookups and exact find.
    Exact,
    /// Per-field search kinds apply (prefix, substring, skip).
    Loose,
}

/// An atomic comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compare {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Text prefix match (`value%`).
    Prefix,
    /// Text substring match (`%value%`).
    Contains,
    /// Greater than or equal (range lower bound).
    Ge,
    /// Strictly less than (range upper bound, exclusive).
    Lt,
}

/// One node of the compiled predicate tree.
///
/// All conditions produced by one compilation combine with logical AND;
/// the engine never introduces an implicit OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// A single comparison against a named field.
    Compare {
        /// Field (column) name.
        field: String,
        /// Comparison operator.
        op: Compare,
        /// Comparison operand.
        value: FieldValue,
    },
    /// Conditions on a referenced entity, behind an inner join.
    Join {
        /// The reference field on the outer entity.
        relation: String,
        /// Collection name of the referenced entity type.
        target: String,
        /// Conditions over the referenced entity's fields (ANDed).
        conditions: Vec<Condition>,
    },
}

impl Condition {
    /// Builds an equality condition.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: FieldValue) -> Self {
        Self::cmp(field, Compare::Eq, value)
    }

    /// Builds a comparison condition.
    #[must_use]
    pub fn cmp(field: impl Into<String>, op: Compare, value: FieldValue) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Evaluates this condition against a field source.
    ///
    /// `Join` conditions evaluate against the relation field's nested
    /// value; a backend with real cross-collection storage would instead
    /// translate the join into its native query language.
    pub fn matches<R: FieldRead + ?Sized>(&self, row: &R) -> bool {
        match self {
            Self::Compare { field, op, value } => {
                compare_values(&row.read_field(field), *op, value)
            }
            Self::Join {
                relation,
                conditions,
                ..
            } => match row.read_field(relation) {
                FieldValue::Nested(nested) => conditions.iter().all(|c| c.matches(&nested)),
                _ => false,
            },
        }
    }
}

fn compare_values(actual: &FieldValue, op: Compare, operand: &FieldValue) -> bool {
    match op {
        Compare::Eq => actual == operand,
        Compare::Ne => actual != operand,
        Compare::Prefix => match (actual, operand) {
            (FieldValue::Text(a), FieldValue::Text(p)) => a.starts_with(p.as_str()),
            _ => false,
        },
        Compare::Contains => match (actual, operand) {
            (FieldValue::Text(a), FieldValue::Text(p)) => a.contains(p.as_str()),
            _ => false,
        },
        // Range bounds never match an absent value.
        Compare::Ge => !actual.is_null() && actual.compare_to(operand) != Ordering::Less,
        Compare::Lt => !actual.is_null() && actual.compare_to(operand) == Ordering::Less,
    }
}

/// One key of a compiled multi-key ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    /// Field to order by.
    pub field: String,
    /// `true` for ascending, `false` for descending.
    pub ascending: bool,
}

impl OrderKey {
    /// Creates an ascending key.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    /// Creates a descending key.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// The abstract query the engine hands to the storage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Conditions, ANDed together. Empty means "match everything".
    pub conditions: Vec<Condition>,
    /// Ordering keys, applied left to right.
    pub order: Vec<OrderKey>,
    /// 0-indexed row offset.
    pub offset: u64,
    /// Maximum number of rows to return.
    pub limit: u64,
}

/// One page of results plus the pre-pagination total.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    /// The rows on this page.
    pub items: Vec<T>,
    /// Total number of matching rows across all pages.
    pub total: u64,
    /// 1-indexed page number.
    pub number: u64,
    /// Page size requested.
    pub size: u64,
}

impl<T> PageResult<T> {
    /// Returns `true` when no further page would yield rows.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.number.saturating_mul(self.size) >= self.total
    }

    /// Maps the page's items, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            number: self.number,
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldMap;

    fn row(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs
            .iter()
            .map(|(n, v)| ((*n).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn eq_matches_same_value() {
        let r = row(&[("name", FieldValue::from("Alice"))]);
        assert!(Condition::eq("name", FieldValue::from("Alice")).matches(&r));
        assert!(!Condition::eq("name", FieldValue::from("Bob")).matches(&r));
    }

    #[test]
    fn prefix_and_contains() {
        let r = row(&[("name", FieldValue::from("Alice"))]);
        assert!(Condition::cmp("name", Compare::Prefix, FieldValue::from("Al")).matches(&r));
        assert!(!Condition::cmp("name", Compare::Prefix, FieldValue::from("li")).matches(&r));
        assert!(Condition::cmp("name", Compare::Contains, FieldValue::from("li")).matches(&r));
    }

    #[test]
    fn range_bounds_exclude_null() {
        let r = row(&[("create_time", FieldValue::Null)]);
        assert!(!Condition::cmp("create_time", Compare::Ge, FieldValue::Int(0)).matches(&r));
        assert!(!Condition::cmp("create_time", Compare::Lt, FieldValue::Int(100)).matches(&r));
    }

    #[test]
    fn range_bound_edges() {
        let r = row(&[("t", FieldValue::Int(10))]);
        assert!(Condition::cmp("t", Compare::Ge, FieldValue::Int(10)).matches(&r));
        assert!(!Condition::cmp("t", Compare::Lt, FieldValue::Int(10)).matches(&r));
        assert!(Condition::cmp("t", Compare::Lt, FieldValue::Int(11)).matches(&r));
    }

    #[test]
    fn ne_matches_absent_field() {
        let r = row(&[]);
        assert!(Condition::cmp("is_disabled", Compare::Ne, FieldValue::Bool(true)).matches(&r));
    }

    #[test]
    fn join_evaluates_nested_value() {
        let inner = row(&[("city", FieldValue::from("Oslo"))]);
        let outer = row(&[("address", FieldValue::Nested(inner))]);

        let cond = Condition::Join {
            relation: "address".into(),
            target: "addresses".into(),
            conditions: vec![Condition::eq("city", FieldValue::from("Oslo"))],
        };
        assert!(cond.matches(&outer));

        let miss = Condition::Join {
            relation: "address".into(),
            target: "addresses".into(),
            conditions: vec![Condition::eq("city", FieldValue::from("Bergen"))],
        };
        assert!(!miss.matches(&outer));
    }

    #[test]
    fn join_on_missing_relation_never_matches() {
        let outer = row(&[]);
        let cond = Condition::Join {
            relation: "address".into(),
            target: "addresses".into(),
            conditions: vec![],
        };
        assert!(!cond.matches(&outer));
    }

    #[test]
    fn last_page_detection() {
        let page = PageResult::<u32> {
            items: vec![],
            total: 25,
            number: 3,
            size: 10,
        };
        assert!(page.is_last());

        let mid = PageResult::<u32> {
            items: vec![],
            total: 25,
            number: 2,
            size: 10,
        };
        assert!(!mid.is_last());
    }
}
