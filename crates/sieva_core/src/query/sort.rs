//! Sort compilation.

use sieva_model::{OrderKey, FIELD_CREATE_TIME, FIELD_ID};

/// A caller-supplied sort request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    /// Requested sort field; defaults to the configured field.
    pub field: Option<String>,
    /// Requested direction token; only a case-insensitive `asc` selects
    /// ascending, anything else (including typos) is descending.
    pub direction: Option<String>,
}

impl SortSpec {
    /// Creates a sort spec from explicit values.
    #[must_use]
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Some(direction.into()),
        }
    }

    /// Creates a sort spec for a field with the default direction.
    #[must_use]
    pub fn by(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: None,
        }
    }
}

/// Compiles a sort request into a deterministic, tie-broken key sequence.
///
/// The resolved primary key is followed by a descending `create_time`
/// tie-break (unless `create_time` already is the primary) and a final
/// descending identity tie-break, so paginated ordering stays stable
/// even when the primary key has duplicate values. Sorting by the
/// identity field itself compiles to a single key.
///
/// An unrecognized direction token is a deliberate fail-safe to
/// descending, not a validation error.
#[must_use]
pub fn compile(spec: &SortSpec, default_field: &str) -> Vec<OrderKey> {
    let field = spec
        .field
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(default_field);

    let ascending = spec
        .direction
        .as_deref()
        .is_some_and(|d| d.trim().eq_ignore_ascii_case("asc"));

    let primary = OrderKey {
        field: field.to_string(),
        ascending,
    };

    if field == FIELD_ID {
        return vec![primary];
    }

    let mut keys = vec![primary];
    if field != FIELD_CREATE_TIME {
        keys.push(OrderKey::desc(FIELD_CREATE_TIME));
    }
    keys.push(OrderKey::desc(FIELD_ID));
    keys
}
