//! Dynamic field value type.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A dynamic field value.
///
/// This type carries the value of one entity field across the engine's
/// generic boundaries: filter compilation, condition evaluation, sorting,
/// and export rendering all operate on `FieldValue` rather than on the
/// concrete entity type.
///
/// `Null` doubles as "field not provided" on filter objects; the engine
/// never searches for NULL explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent or null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (also used for epoch-millisecond timestamps).
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Nested record, used for reference-field filter values.
    Nested(FieldMap),
}

impl FieldValue {
    /// Wraps an optional text value, mapping `None` to `Null`.
    #[must_use]
    pub fn text(value: Option<&str>) -> Self {
        match value {
            Some(s) => Self::Text(s.to_string()),
            None => Self::Null,
        }
    }

    /// Wraps an optional integer value, mapping `None` to `Null`.
    #[must_use]
    pub fn int(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Int)
    }

    /// Wraps an optional boolean value, mapping `None` to `Null`.
    #[must_use]
    pub fn bool(value: Option<bool>) -> Self {
        value.map_or(Self::Null, Self::Bool)
    }

    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the nested map, if this is a nested value.
    #[must_use]
    pub fn as_nested(&self) -> Option<&FieldMap> {
        match self {
            Self::Nested(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` if this is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if the value counts as "not provided" on a filter.
    ///
    /// Null, blank text, numeric zero, `false`, and empty nested maps are
    /// all vacant: a filter field left at its zero value contributes no
    /// condition. An intentionally-searched empty string is rescued by the
    /// descriptor's `search_empty` flag, not by this classification.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => s.is_empty(),
            Self::Nested(m) => m.is_empty(),
        }
    }

    /// Total ordering used for sort-key evaluation.
    ///
    /// `Null` sorts before everything; mismatched variants fall back to a
    /// stable variant-rank comparison so ordering is still total.
    #[must_use]
    pub fn compare_to(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Int(a), Self::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Self::Float(a), Self::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }

    /// Renders the value as a CSV cell, quoting when necessary.
    #[must_use]
    pub fn to_csv_cell(&self) -> String {
        let raw = match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Nested(_) => String::new(),
        };
        if raw.contains(',') || raw.contains('"') || raw.contains('\n') || raw.contains('\r') {
            format!("\"{}\"", raw.replace('"', "\"\""))
        } else {
            raw
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Nested(_) => 5,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Nested(_) => write!(f, "<nested>"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// An ordered field-name to value map.
///
/// Insertion order is preserved so compiled conditions follow field
/// declaration order. Used for nested reference-filter values and as the
/// generic row shape at the export boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets a field value, replacing any previous value for the name.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Gets a field value by name; missing names read as `Null`.
    #[must_use]
    pub fn get(&self, name: &str) -> FieldValue {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or(FieldValue::Null)
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.set(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacancy_classification() {
        assert!(FieldValue::Null.is_vacant());
        assert!(FieldValue::Text(String::new()).is_vacant());
        assert!(FieldValue::Int(0).is_vacant());
        assert!(FieldValue::Bool(false).is_vacant());
        assert!(!FieldValue::Text("x".into()).is_vacant());
        assert!(!FieldValue::Int(-1).is_vacant());
        assert!(!FieldValue::Bool(true).is_vacant());
    }

    #[test]
    fn null_sorts_first() {
        assert_eq!(
            FieldValue::Null.compare_to(&FieldValue::Int(i64::MIN)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Text("a".into()).compare_to(&FieldValue::Null),
            Ordering::Greater
        );
    }

    #[test]
    fn mixed_numeric_comparison() {
        assert_eq!(
            FieldValue::Int(2).compare_to(&FieldValue::Float(2.5)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Float(3.0).compare_to(&FieldValue::Int(3)),
            Ordering::Equal
        );
    }

    #[test]
    fn csv_cell_quoting() {
        assert_eq!(FieldValue::Text("plain".into()).to_csv_cell(), "plain");
        assert_eq!(FieldValue::Text("a,b".into()).to_csv_cell(), "\"a,b\"");
        assert_eq!(
            FieldValue::Text("say \"hi\"".into()).to_csv_cell(),
            "\"say \"\"hi\"\"\""
        );
        assert_eq!(FieldValue::Null.to_csv_cell(), "");
    }

    #[test]
    fn field_map_replaces_on_set() {
        let mut map = FieldMap::new();
        map.set("name", FieldValue::from("a"));
        map.set("name", FieldValue::from("b"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("name"), FieldValue::from("b"));
    }

    #[test]
    fn field_map_missing_reads_null() {
        let map = FieldMap::new();
        assert_eq!(map.get("absent"), FieldValue::Null);
    }

    #[test]
    fn nested_values_survive_json() {
        let mut inner = FieldMap::new();
        inner.set("city", FieldValue::from("Oslo"));
        let value = FieldValue::Nested(inner);

        let raw = serde_json::to_string(&value).unwrap();
        let back: FieldValue = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn field_map_preserves_insertion_order() {
        let mut map = FieldMap::new();
        map.set("b", FieldValue::Int(1));
        map.set("a", FieldValue::Int(2));
        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
