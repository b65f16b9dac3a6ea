//! Entity identity, base fields, and the entity contract.

use crate::descriptor::FieldDescriptor;
use crate::value::{FieldMap, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the identity field shared by all entities.
pub const FIELD_ID: &str = "id";
/// Name of the creation-timestamp field.
pub const FIELD_CREATE_TIME: &str = "create_time";
/// Name of the last-update-timestamp field.
pub const FIELD_UPDATE_TIME: &str = "update_time";
/// Name of the disabled flag used for enable/disable and soft delete.
pub const FIELD_IS_DISABLED: &str = "is_disabled";

/// Unique identifier for an entity.
///
/// Entity IDs are server-assigned, monotonically increasing integers:
/// - Assigned exactly once at insert, immutable thereafter
/// - Never reused within a store
/// - Used as the final sort tie-breaker for deterministic pagination
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Server-managed fields embedded by value in every entity.
///
/// Composition replaces a base-class hierarchy: entities embed
/// `EntityBase` and the engine reaches it through [`Entity::base`].
/// All fields are optional because the same shape serves as a filter
/// object, where absence means "do not constrain."
///
/// Invariants enforced by the lifecycle engine:
/// - `id` is assigned by storage and immutable afterwards
/// - `create_time` is stamped exactly once and never updated
/// - `update_time` is restamped on every write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBase {
    /// Server-assigned identity.
    pub id: Option<EntityId>,
    /// Creation time, epoch milliseconds.
    pub create_time: Option<i64>,
    /// Last update time, epoch milliseconds.
    pub update_time: Option<i64>,
    /// Disabled flag; also the soft-delete marker.
    pub is_disabled: Option<bool>,
}

impl EntityBase {
    /// Creates an empty base (all fields unset), suitable for filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a base field by name; unknown names read as `Null`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            FIELD_ID => Some(FieldValue::int(self.id.map(|id| id.raw() as i64))),
            FIELD_CREATE_TIME => Some(FieldValue::int(self.create_time)),
            FIELD_UPDATE_TIME => Some(FieldValue::int(self.update_time)),
            FIELD_IS_DISABLED => Some(FieldValue::bool(self.is_disabled)),
            _ => None,
        }
    }
}

/// Read access to named fields.
///
/// Implemented by entities and by [`FieldMap`], so condition evaluation
/// works uniformly over typed rows and nested reference values.
pub trait FieldRead {
    /// Reads a field by name; absent fields read as `Null`.
    fn read_field(&self, name: &str) -> FieldValue;
}

impl FieldRead for FieldMap {
    fn read_field(&self, name: &str) -> FieldValue {
        self.get(name)
    }
}

/// The contract every Sieva entity type implements.
///
/// A type implements `Entity` once, statically: it names its collection,
/// lists its field descriptors in declaration order, exposes the embedded
/// [`EntityBase`], and maps field names to values in both directions.
/// The same type serves as its own filter object - a filter is simply an
/// instance with most fields left unset.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Collection (table) name for this entity type.
    fn collection() -> &'static str;

    /// Field descriptors in declaration order.
    ///
    /// Base fields (`id`, `create_time`, `update_time`, `is_disabled`)
    /// are implicit and must not be listed.
    fn descriptors() -> Vec<FieldDescriptor>;

    /// Returns the embedded server-managed base.
    fn base(&self) -> &EntityBase;

    /// Returns the embedded server-managed base, mutably.
    fn base_mut(&mut self) -> &mut EntityBase;

    /// Reads a declared (non-base) field by name.
    ///
    /// Unknown names must read as `Null`.
    fn get(&self, name: &str) -> FieldValue;

    /// Writes a declared (non-base) field by name.
    ///
    /// Unknown names must be ignored.
    fn set(&mut self, name: &str, value: FieldValue);

    /// Reads any field, base fields included.
    fn field(&self, name: &str) -> FieldValue {
        match self.base().field(name) {
            Some(value) => value,
            None => self.get(name),
        }
    }
}

impl<E: Entity> FieldRead for E {
    fn read_field(&self, name: &str) -> FieldValue {
        self.field(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDescriptor;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Probe {
        base: EntityBase,
        name: Option<String>,
    }

    impl Entity for Probe {
        fn collection() -> &'static str {
            "probes"
        }

        fn descriptors() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::column("name")]
        }

        fn base(&self) -> &EntityBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut EntityBase {
            &mut self.base
        }

        fn get(&self, name: &str) -> FieldValue {
            match name {
                "name" => FieldValue::text(self.name.as_deref()),
                _ => FieldValue::Null,
            }
        }

        fn set(&mut self, name: &str, value: FieldValue) {
            if name == "name" {
                self.name = value.as_text().map(str::to_string);
            }
        }
    }

    #[test]
    fn id_ordering_and_display() {
        let a = EntityId::new(1);
        let b = EntityId::new(2);
        assert!(a < b);
        assert_eq!(format!("{a}"), "1");
    }

    #[test]
    fn base_fields_read_through_field() {
        let mut probe = Probe::default();
        probe.base_mut().id = Some(EntityId::new(7));
        probe.base_mut().is_disabled = Some(false);

        assert_eq!(probe.field(FIELD_ID), FieldValue::Int(7));
        assert_eq!(probe.field(FIELD_IS_DISABLED), FieldValue::Bool(false));
        assert_eq!(probe.field(FIELD_CREATE_TIME), FieldValue::Null);
    }

    #[test]
    fn declared_fields_read_through_field() {
        let mut probe = Probe::default();
        probe.set("name", FieldValue::from("alpha"));
        assert_eq!(probe.field("name"), FieldValue::Text("alpha".into()));
        assert_eq!(probe.field("unknown"), FieldValue::Null);
    }

    #[test]
    fn set_ignores_unknown_fields() {
        let mut probe = Probe::default();
        probe.set("bogus", FieldValue::Int(1));
        assert_eq!(probe, Probe::default());
    }
}
