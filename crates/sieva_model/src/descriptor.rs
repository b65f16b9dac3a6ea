//! Per-field search metadata.

use serde::{Deserialize, Serialize};

/// How a column participates in loose (search-mode) filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Equality match (the default for unannotated fields).
    Exact,
    /// Prefix match (`value%`).
    Prefix,
    /// Substring match (`%value%`).
    Substring,
    /// Never compiled into a condition.
    Skip,
}

/// The single role a field plays in query compilation.
///
/// A field is a plain column, one bound of a transient time range, or a
/// reference requiring a join - never more than one at once. The enum
/// makes the exclusivity structural rather than a validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldRole {
    /// A stored column, searchable per its mode.
    Column {
        /// Loose-mode search behavior.
        search: SearchMode,
        /// When set, an explicitly blank string still compiles into an
        /// equality-on-empty condition instead of being skipped.
        search_empty: bool,
        /// When set, the lifecycle engine enforces per-field uniqueness.
        unique: bool,
    },
    /// Transient lower bound (`>=`) over a base column.
    RangeFrom {
        /// The stored column the bound applies to.
        column: String,
    },
    /// Transient exclusive upper bound (`<`) over a base column.
    RangeTo {
        /// The stored column the bound applies to.
        column: String,
    },
    /// A reference to another entity; filter values nest and join.
    Reference {
        /// Collection name of the referenced entity type.
        target: String,
    },
}

/// Metadata for one entity field.
///
/// Descriptors are declared statically per entity type (via
/// `Entity::descriptors`) and classified once by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// The field's single role.
    pub role: FieldRole,
}

impl FieldDescriptor {
    /// Declares a plain column with default (exact) search.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::Column {
                search: SearchMode::Exact,
                search_empty: false,
                unique: false,
            },
        }
    }

    /// Declares a column excluded from loose-mode search.
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self::column(name).search(SearchMode::Skip)
    }

    /// Declares a transient `>=` bound over `column`.
    #[must_use]
    pub fn range_from(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::RangeFrom {
                column: column.into(),
            },
        }
    }

    /// Declares a transient `<` bound over `column`.
    #[must_use]
    pub fn range_to(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::RangeTo {
                column: column.into(),
            },
        }
    }

    /// Declares a reference to another entity type's collection.
    #[must_use]
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::Reference {
                target: target.into(),
            },
        }
    }

    /// Sets the loose-mode search behavior. Only meaningful on columns.
    #[must_use]
    pub fn search(mut self, mode: SearchMode) -> Self {
        if let FieldRole::Column { search, .. } = &mut self.role {
            *search = mode;
        }
        self
    }

    /// Marks the column unique. Only meaningful on columns.
    #[must_use]
    pub fn unique(mut self) -> Self {
        if let FieldRole::Column { unique, .. } = &mut self.role {
            *unique = true;
        }
        self
    }

    /// Allows an explicitly blank string to be searched as equality on
    /// the empty string. Only meaningful on columns.
    #[must_use]
    pub fn search_empty(mut self) -> Self {
        if let FieldRole::Column { search_empty, .. } = &mut self.role {
            *search_empty = true;
        }
        self
    }

    /// Returns `true` if this descriptor is a unique column.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        matches!(self.role, FieldRole::Column { unique: true, .. })
    }

    /// Returns `true` if this descriptor is a plain column.
    #[must_use]
    pub fn is_column(&self) -> bool {
        matches!(self.role, FieldRole::Column { .. })
    }
}
