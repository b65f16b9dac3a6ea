//! Entity metadata registry.

use parking_lot::RwLock;
use sieva_model::{Entity, FieldDescriptor, FieldRole};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// The classified metadata for one entity type.
///
/// Built once per type from `Entity::descriptors()`, preserving
/// declaration order. Fields the entity declared without annotations
/// default to exact match at descriptor-construction time, so nothing is
/// ever silently dropped from filter compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Collection name of the described entity type.
    pub collection: String,
    /// Field descriptors in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    fn build<E: Entity>() -> Self {
        Self {
            collection: E::collection().to_string(),
            fields: E::descriptors(),
        }
    }

    /// Iterates over plain-column descriptors in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|d| d.is_column())
    }

    /// Iterates over unique-column descriptors in declaration order.
    pub fn unique_columns(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|d| d.is_unique())
    }

    /// Iterates over transient range-bound descriptors, yielding the
    /// bound field name, the base column, and whether it is the lower
    /// bound.
    pub fn range_bounds(&self) -> impl Iterator<Item = (&str, &str, bool)> {
        self.fields.iter().filter_map(|d| match &d.role {
            FieldRole::RangeFrom { column } => Some((d.name.as_str(), column.as_str(), true)),
            FieldRole::RangeTo { column } => Some((d.name.as_str(), column.as_str(), false)),
            _ => None,
        })
    }
}

/// Memoized per-type descriptor registry.
///
/// Descriptors are computed once per `TypeId` and handed out as shared
/// `Arc`s, so after the first build every read is lock-free on the
/// descriptor itself. The registry is also indexed by collection name,
/// which is how reference-field compilation resolves the target entity
/// type's descriptor set.
#[derive(Debug, Default)]
pub struct Registry {
    by_type: RwLock<HashMap<TypeId, Arc<EntityDescriptor>>>,
    by_collection: RwLock<HashMap<String, Arc<EntityDescriptor>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor for `E`, building and memoizing it on
    /// first use.
    pub fn describe<E: Entity>(&self) -> Arc<EntityDescriptor> {
        let type_id = TypeId::of::<E>();
        if let Some(descriptor) = self.by_type.read().get(&type_id) {
            return Arc::clone(descriptor);
        }

        let descriptor = Arc::new(EntityDescriptor::build::<E>());
        let mut by_type = self.by_type.write();
        // Another thread may have built it between the read and write
        // lock; keep the first build.
        let entry = by_type
            .entry(type_id)
            .or_insert_with(|| Arc::clone(&descriptor));
        let descriptor = Arc::clone(entry);
        drop(by_type);

        self.by_collection
            .write()
            .entry(descriptor.collection.clone())
            .or_insert_with(|| Arc::clone(&descriptor));
        descriptor
    }

    /// Returns the descriptor registered under a collection name.
    ///
    /// Only types that have passed through [`Registry::describe`] are
    /// resolvable; reference compilation falls back to exact matching
    /// for unknown targets.
    #[must_use]
    pub fn describe_collection(&self, collection: &str) -> Option<Arc<EntityDescriptor>> {
        self.by_collection.read().get(collection).map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieva_model::{EntityBase, FieldValue, SearchMode};

    #[derive(Debug, Clone, Default)]
    struct Order {
        base: EntityBase,
        code: Option<String>,
        note: Option<String>,
        created_from: Option<i64>,
        created_to: Option<i64>,
    }

    impl Entity for Order {
        fn collection() -> &'static str {
            "orders"
        }

        fn descriptors() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::column("code").unique(),
                FieldDescriptor::column("note").search(SearchMode::Substring),
                FieldDescriptor::range_from("created_from", "create_time"),
                FieldDescriptor::range_to("created_to", "create_time"),
            ]
        }

        fn base(&self) -> &EntityBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut EntityBase {
            &mut self.base
        }

        fn get(&self, name: &str) -> FieldValue {
            match name {
                "code" => FieldValue::text(self.code.as_deref()),
                "note" => FieldValue::text(self.note.as_deref()),
                "created_from" => FieldValue::int(self.created_from),
                "created_to" => FieldValue::int(self.created_to),
                _ => FieldValue::Null,
            }
        }

        fn set(&mut self, name: &str, value: FieldValue) {
            match name {
                "code" => self.code = value.as_text().map(str::to_string),
                "note" => self.note = value.as_text().map(str::to_string),
                "created_from" => self.created_from = value.as_int(),
                "created_to" => self.created_to = value.as_int(),
                _ => {}
            }
        }
    }

    #[test]
    fn describe_is_memoized() {
        let registry = Registry::new();
        let a = registry.describe::<Order>();
        let b = registry.describe::<Order>();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn describe_preserves_declaration_order() {
        let registry = Registry::new();
        let descriptor = registry.describe::<Order>();
        let names: Vec<&str> = descriptor.fields.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["code", "note", "created_from", "created_to"]);
    }

    #[test]
    fn collection_index_resolves_after_describe() {
        let registry = Registry::new();
        assert!(registry.describe_collection("orders").is_none());

        let descriptor = registry.describe::<Order>();
        let by_name = registry.describe_collection("orders").unwrap();
        assert!(Arc::ptr_eq(&descriptor, &by_name));
    }

    #[test]
    fn classified_views() {
        let registry = Registry::new();
        let descriptor = registry.describe::<Order>();

        let uniques: Vec<&str> = descriptor.unique_columns().map(|d| d.name.as_str()).collect();
        assert_eq!(uniques, vec!["code"]);

        let bounds: Vec<(&str, &str, bool)> = descriptor.range_bounds().collect();
        assert_eq!(
            bounds,
            vec![
                ("created_from", "create_time", true),
                ("created_to", "create_time", false),
            ]
        );
    }

    #[test]
    fn concurrent_describe_agrees() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.describe::<Order>())
            })
            .collect();

        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for d in &descriptors {
            assert!(Arc::ptr_eq(d, &descriptors[0]));
        }
    }
}
