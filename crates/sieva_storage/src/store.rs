//! Entity store boundary and in-memory reference implementation.

use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use sieva_model::{Condition, Entity, EntityId, FieldRead, PageResult, Query};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Storage boundary for one entity collection.
///
/// The engine emits an abstract [`Query`] (conditions, order keys,
/// offset/limit) and expects back one page of entities plus the total
/// match count. It also issues single-row lookups by id and by a
/// condition list (for uniqueness checks).
///
/// Implementations must be `Send + Sync`; the engine shares one store
/// across the caller thread and the export worker pool.
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Inserts a new row, assigning the next monotonic identity.
    ///
    /// The entity's `id` field is overwritten with the assigned value.
    fn insert(&self, entity: E) -> StorageResult<EntityId>;

    /// Reads a row by identity.
    fn get(&self, id: EntityId) -> StorageResult<Option<E>>;

    /// Replaces an existing row in full.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RowNotFound`] if the id has no row.
    fn replace(&self, id: EntityId, entity: E) -> StorageResult<()>;

    /// Removes a row. Returns `true` if a row existed.
    fn remove(&self, id: EntityId) -> StorageResult<bool>;

    /// Returns the first row matching all conditions, if any.
    fn find_one(&self, conditions: &[Condition]) -> StorageResult<Option<E>>;

    /// Executes an abstract query, returning one page plus the total
    /// match count across all pages.
    fn select(&self, query: &Query) -> StorageResult<PageResult<E>>;
}

/// Thread-safe in-memory entity store.
///
/// Rows live in a `BTreeMap` keyed by raw id, so full scans iterate in
/// identity order. Conditions are evaluated with [`Condition::matches`];
/// `Join` conditions therefore match against the relation field's nested
/// value (see the crate docs of `sieva_model`).
pub struct MemoryStore<E: Entity> {
    rows: RwLock<BTreeMap<u64, E>>,
    next_id: AtomicU64,
}

impl<E: Entity> MemoryStore<E> {
    /// Creates an empty store. Identities start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the number of stored rows, disabled rows included.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.rows.read().len()
    }

    /// Reads a row without any engine-level filtering.
    ///
    /// Unlike the engine's `get`, this sees soft-deleted rows. Useful in
    /// tests asserting the soft-delete law.
    #[must_use]
    pub fn raw_get(&self, id: EntityId) -> Option<E> {
        self.rows.read().get(&id.raw()).cloned()
    }

    fn sort_rows(rows: &mut [E], order: &[sieva_model::OrderKey]) {
        rows.sort_by(|a, b| {
            for key in order {
                let ord = a
                    .read_field(&key.field)
                    .compare_to(&b.read_field(&key.field));
                let ord = if key.ascending { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityStore<E> for MemoryStore<E> {
    fn insert(&self, mut entity: E) -> StorageResult<EntityId> {
        let id = EntityId::new(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
        entity.base_mut().id = Some(id);
        self.rows.write().insert(id.raw(), entity);
        Ok(id)
    }

    fn get(&self, id: EntityId) -> StorageResult<Option<E>> {
        Ok(self.rows.read().get(&id.raw()).cloned())
    }

    fn replace(&self, id: EntityId, entity: E) -> StorageResult<()> {
        let mut rows = self.rows.write();
        if !rows.contains_key(&id.raw()) {
            return Err(StorageError::row_not_found(E::collection(), id.raw()));
        }
        rows.insert(id.raw(), entity);
        Ok(())
    }

    fn remove(&self, id: EntityId) -> StorageResult<bool> {
        Ok(self.rows.write().remove(&id.raw()).is_some())
    }

    fn find_one(&self, conditions: &[Condition]) -> StorageResult<Option<E>> {
        let rows = self.rows.read();
        Ok(rows
            .values()
            .find(|row| conditions.iter().all(|c| c.matches(*row)))
            .cloned())
    }

    fn select(&self, query: &Query) -> StorageResult<PageResult<E>> {
        let mut matched: Vec<E> = {
            let rows = self.rows.read();
            rows.values()
                .filter(|row| query.conditions.iter().all(|c| c.matches(*row)))
                .cloned()
                .collect()
        };

        Self::sort_rows(&mut matched, &query.order);

        let total = matched.len() as u64;
        let items: Vec<E> = matched
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .collect();

        // 1-indexed page number recovered from the offset for callers
        // that inspect the page metadata directly.
        let size = query.limit.max(1);
        let number = query.offset / size + 1;

        Ok(PageResult {
            items,
            total,
            number,
            size: query.limit,
        })
    }
}

impl<E: Entity> std::fmt::Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("rows", &self.raw_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieva_model::{
        Compare, EntityBase, FieldDescriptor, FieldValue, OrderKey, SearchMode,
    };

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        base: EntityBase,
        name: Option<String>,
        qty: Option<i64>,
    }

    impl Entity for Item {
        fn collection() -> &'static str {
            "items"
        }

        fn descriptors() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::column("name").search(SearchMode::Prefix),
                FieldDescriptor::column("qty"),
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
                "name" => FieldValue::text(self.name.as_deref()),
                "qty" => FieldValue::int(self.qty),
                _ => FieldValue::Null,
            }
        }

        fn set(&mut self, name: &str, value: FieldValue) {
            match name {
                "name" => self.name = value.as_text().map(str::to_string),
                "qty" => self.qty = value.as_int(),
                _ => {}
            }
        }
    }

    fn named(name: &str, qty: i64) -> Item {
        Item {
            base: EntityBase::new(),
            name: Some(name.to_string()),
            qty: Some(qty),
        }
    }

    fn seeded() -> MemoryStore<Item> {
        let store = MemoryStore::new();
        store.insert(named("Alice", 3)).unwrap();
        store.insert(named("Alan", 1)).unwrap();
        store.insert(named("Bob", 2)).unwrap();
        store
    }

    #[test]
    fn insert_assigns_monotonic_ids() {
        let store = MemoryStore::new();
        let a = store.insert(named("a", 0)).unwrap();
        let b = store.insert(named("b", 0)).unwrap();
        assert!(a < b);
        assert_eq!(store.get(a).unwrap().unwrap().base.id, Some(a));
    }

    #[test]
    fn replace_missing_row_fails() {
        let store: MemoryStore<Item> = MemoryStore::new();
        let err = store.replace(EntityId::new(42), named("x", 0)).unwrap_err();
        assert!(matches!(err, StorageError::RowNotFound { id: 42, .. }));
    }

    #[test]
    fn remove_reports_existence() {
        let store = MemoryStore::new();
        let id = store.insert(named("a", 0)).unwrap();
        assert!(store.remove(id).unwrap());
        assert!(!store.remove(id).unwrap());
    }

    #[test]
    fn find_one_applies_all_conditions() {
        let store = seeded();
        let hit = store
            .find_one(&[
                Condition::eq("name", FieldValue::from("Alan")),
                Condition::eq("qty", FieldValue::Int(1)),
            ])
            .unwrap();
        assert_eq!(hit.unwrap().name.as_deref(), Some("Alan"));

        let miss = store
            .find_one(&[
                Condition::eq("name", FieldValue::from("Alan")),
                Condition::eq("qty", FieldValue::Int(99)),
            ])
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn select_filters_sorts_and_paginates() {
        let store = seeded();
        let query = Query {
            conditions: vec![Condition::cmp(
                "name",
                Compare::Prefix,
                FieldValue::from("Al"),
            )],
            order: vec![OrderKey::asc("name")],
            offset: 0,
            limit: 10,
        };
        let page = store.select(&query).unwrap();
        assert_eq!(page.total, 2);
        let names: Vec<&str> = page
            .items
            .iter()
            .map(|i| i.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["Alan", "Alice"]);
    }

    #[test]
    fn select_total_counts_beyond_page() {
        let store = seeded();
        let query = Query {
            conditions: vec![],
            order: vec![OrderKey::asc("qty")],
            offset: 1,
            limit: 1,
        };
        let page = store.select(&query).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].qty, Some(2));
        assert_eq!(page.number, 2);
    }

    #[test]
    fn select_orders_descending() {
        let store = seeded();
        let query = Query {
            conditions: vec![],
            order: vec![OrderKey::desc("qty")],
            offset: 0,
            limit: 10,
        };
        let page = store.select(&query).unwrap();
        let qty: Vec<i64> = page.items.iter().map(|i| i.qty.unwrap()).collect();
        assert_eq!(qty, vec![3, 2, 1]);
    }

    #[test]
    fn raw_get_sees_everything() {
        let store = seeded();
        let query = Query {
            conditions: vec![],
            order: vec![],
            offset: 0,
            limit: 10,
        };
        let all = store.select(&query).unwrap();
        for item in &all.items {
            assert!(store.raw_get(item.base.id.unwrap()).is_some());
        }
    }
}
