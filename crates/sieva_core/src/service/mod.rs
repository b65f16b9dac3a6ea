//! Generic entity lifecycle engine.
//!
//! [`EntityService`] gives any [`Entity`] type consistent
//! create/read/update/delete semantics: server-side stamping, hook
//! points, uniqueness validation, partial-update merge, soft delete,
//! and lock-guarded mutation. It is a convenience layer over the
//! injected storage boundary; all queries it issues go through the
//! compilers in [`crate::query`].

mod hooks;

pub use hooks::{AfterHook, BeforeHook, Hooks, LoadHook};

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::lock::{LockManager, LockToken};
use crate::query::{compile_conditions, compile_sort, normalize, PageRequest, SortSpec};
use crate::registry::{EntityDescriptor, Registry};
use crate::runner::TaskRunner;
use sieva_model::{
    Condition, Entity, EntityBase, EntityId, FieldValue, MatchMode, PageResult, Query,
};
use sieva_storage::EntityStore;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// How an update treats fields the patch leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMode {
    /// Only non-null patch fields overwrite the stored entity; fields
    /// listed in `null_fields` are explicitly cleared even though the
    /// patch carries them as null.
    Merge {
        /// Fields the caller wants set to null.
        null_fields: Vec<String>,
    },
    /// Every declared field is taken from the patch, nulls included.
    Overwrite,
}

impl UpdateMode {
    /// Merge mode with no null-enabled fields.
    #[must_use]
    pub fn merge() -> Self {
        Self::Merge {
            null_fields: Vec::new(),
        }
    }
}

/// The lifecycle engine for one entity type.
///
/// Constructed once per type at startup and shared via `Arc`; every
/// collaborator (store, runner, lock manager, registry) is injected, so
/// there is no global state anywhere in the engine.
pub struct EntityService<E: Entity> {
    registry: Arc<Registry>,
    store: Arc<dyn EntityStore<E>>,
    runner: Arc<dyn TaskRunner>,
    locks: Arc<LockManager>,
    hooks: Hooks<E>,
    config: Config,
}

impl<E: Entity> EntityService<E> {
    /// Creates a service over the given collaborators.
    ///
    /// The entity's descriptor is built eagerly so that other types'
    /// reference fields can resolve this collection by name.
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn EntityStore<E>>,
        runner: Arc<dyn TaskRunner>,
        locks: Arc<LockManager>,
        config: Config,
    ) -> Self {
        registry.describe::<E>();
        Self {
            registry,
            store,
            runner,
            locks,
            hooks: Hooks::new(),
            config,
        }
    }

    /// Installs the service's hook set.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks<E>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the shared metadata registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ---- write path ----------------------------------------------------

    /// Adds a new entity.
    ///
    /// The before-add hook runs first and may mutate or veto the
    /// payload. Identity and timestamps are always server-assigned:
    /// whatever the caller put in the base fields is discarded.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] for an empty payload,
    /// [`CoreError::DuplicateValue`] on a uniqueness collision.
    pub fn add(&self, mut entity: E) -> CoreResult<E> {
        if let Some(hook) = &self.hooks.before_add {
            hook(&mut entity)?;
        }

        let descriptor = self.registry.describe::<E>();
        if descriptor
            .fields
            .iter()
            .all(|d| entity.field(&d.name).is_null())
        {
            return Err(CoreError::validation("empty payload"));
        }

        let now = now_millis();
        let base = entity.base_mut();
        base.id = None;
        base.create_time = Some(now);
        base.update_time = Some(now);
        base.is_disabled = Some(false);

        self.check_unique(&entity, None)?;
        let id = self.store.insert(entity.clone())?;
        entity.base_mut().id = Some(id);

        self.dispatch_post(
            &entity,
            &[self.hooks.after_add.clone(), self.hooks.after_saved.clone()],
        );
        Ok(entity)
    }

    /// Updates an existing entity and returns the stored result.
    ///
    /// `create_time` never changes; `update_time` always advances.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] when the patch has no id,
    /// [`CoreError::NotFound`] when no visible row matches,
    /// [`CoreError::Forbidden`] when the row is disabled and the service
    /// requires enablement first, [`CoreError::DuplicateValue`] on a
    /// uniqueness collision.
    pub fn update(&self, mut patch: E, mode: UpdateMode) -> CoreResult<E> {
        if let Some(hook) = &self.hooks.before_update {
            hook(&mut patch)?;
        }
        let id = patch
            .base()
            .id
            .ok_or_else(|| CoreError::validation("update requires an id"))?;

        let stored = self.fetch_visible(id)?;
        if self.config.require_enabled_for_update && stored.base().is_disabled == Some(true) {
            return Err(CoreError::forbidden(
                "entity is disabled; enable it before updating",
            ));
        }

        let descriptor = self.registry.describe::<E>();
        let merged = apply_update(stored, &patch, &mode, &descriptor);

        self.check_unique(&merged, Some(id))?;
        self.store.replace(id, merged.clone())?;

        self.dispatch_post(
            &merged,
            &[
                self.hooks.after_update.clone(),
                self.hooks.after_saved.clone(),
            ],
        );
        Ok(merged)
    }

    /// Deletes an entity: soft (disable + read exclusion) when the
    /// service is configured for soft delete, hard removal otherwise.
    pub fn delete(&self, id: EntityId) -> CoreResult<()> {
        let mut stored = self.fetch_visible(id)?;
        if let Some(hook) = &self.hooks.before_delete {
            hook(&mut stored)?;
        }

        if self.config.soft_delete {
            stored.base_mut().is_disabled = Some(true);
            restamp(stored.base_mut());
            self.store.replace(id, stored.clone())?;
        } else if !self.store.remove(id)? {
            return Err(CoreError::not_found(E::collection(), id.raw()));
        }

        self.dispatch_post(&stored, &[self.hooks.after_delete.clone()]);
        Ok(())
    }

    /// Re-enables an entity.
    ///
    /// Reads the row directly from storage, so a soft-deleted entity can
    /// be resurrected; `get` and `search` keep excluding it until then.
    pub fn enable(&self, id: EntityId) -> CoreResult<E> {
        self.toggle(
            id,
            false,
            self.hooks.before_enable.clone(),
            self.hooks.after_enable.clone(),
        )
    }

    /// Disables an entity without deleting it.
    pub fn disable(&self, id: EntityId) -> CoreResult<E> {
        self.toggle(
            id,
            true,
            self.hooks.before_disable.clone(),
            self.hooks.after_disable.clone(),
        )
    }

    fn toggle(
        &self,
        id: EntityId,
        disabled: bool,
        before: Option<BeforeHook<E>>,
        after: Option<AfterHook<E>>,
    ) -> CoreResult<E> {
        let mut stored = self
            .store
            .get(id)?
            .ok_or_else(|| CoreError::not_found(E::collection(), id.raw()))?;
        if let Some(hook) = before {
            hook(&mut stored)?;
        }

        stored.base_mut().is_disabled = Some(disabled);
        restamp(stored.base_mut());
        self.store.replace(id, stored.clone())?;

        self.dispatch_post(&stored, &[after, self.hooks.after_saved.clone()]);
        Ok(stored)
    }

    // ---- read path -----------------------------------------------------

    /// Reads one entity by id.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] for missing rows and, under soft delete,
    /// for disabled rows.
    pub fn get(&self, id: EntityId) -> CoreResult<E> {
        let mut entity = self.fetch_visible(id)?;
        if let Some(hook) = &self.hooks.after_load {
            hook(&mut entity);
        }
        Ok(entity)
    }

    /// Returns whether a visible row exists for the id.
    pub fn exists(&self, id: EntityId) -> CoreResult<bool> {
        match self.fetch_visible(id) {
            Ok(_) => Ok(true),
            Err(CoreError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Runs a loose (search-mode) filtered, sorted, paginated read.
    pub fn search(&self, request: &PageRequest<E>) -> CoreResult<PageResult<E>> {
        let page = normalize(request.page, self.config.default_page_size);
        let order = compile_sort(&request.sort, &self.config.default_sort_field);
        let conditions = compile_conditions(
            &self.registry,
            &request.filter,
            MatchMode::Loose,
            self.hooks.conditions.as_deref(),
            self.config.soft_delete,
        );

        let query = Query {
            conditions,
            order,
            offset: page.offset(),
            limit: page.size,
        };
        let mut result = self.store.select(&query)?;
        result.number = page.number;
        result.size = page.size;

        if let Some(hook) = &self.hooks.after_load {
            for item in &mut result.items {
                hook(item);
            }
        }
        Ok(result)
    }

    /// Returns every row matching the probe exactly.
    ///
    /// Exact mode overrides per-field search kinds: prefix- and
    /// substring-annotated fields still compare by equality here.
    pub fn find_matching(&self, probe: &E) -> CoreResult<Vec<E>> {
        let conditions = compile_conditions(
            &self.registry,
            probe,
            MatchMode::Exact,
            self.hooks.conditions.as_deref(),
            self.config.soft_delete,
        );
        let query = Query {
            conditions,
            order: compile_sort(&SortSpec::default(), &self.config.default_sort_field),
            offset: 0,
            limit: u64::MAX,
        };
        let mut result = self.store.select(&query)?;
        if let Some(hook) = &self.hooks.after_load {
            for item in &mut result.items {
                hook(item);
            }
        }
        Ok(result.items)
    }

    /// Counts rows matching the filter loosely.
    pub fn count(&self, filter: &E) -> CoreResult<u64> {
        let conditions = compile_conditions(
            &self.registry,
            filter,
            MatchMode::Loose,
            self.hooks.conditions.as_deref(),
            self.config.soft_delete,
        );
        let query = Query {
            conditions,
            order: Vec::new(),
            offset: 0,
            limit: 0,
        };
        Ok(self.store.select(&query)?.total)
    }

    // ---- locked mutation -----------------------------------------------

    /// Acquires the distributed lock for one entity row.
    ///
    /// # Errors
    ///
    /// [`CoreError::Busy`] when the lock is not acquired within
    /// `timeout`.
    pub fn lock_entity(&self, id: EntityId, timeout: Duration) -> CoreResult<LockToken> {
        self.locks
            .acquire(&LockManager::entity_key(E::collection(), id.raw()), timeout)
    }

    /// Releases a previously acquired entity lock.
    pub fn release_lock(&self, token: &LockToken) -> CoreResult<()> {
        self.locks.release(token)
    }

    /// Runs a mutation under the entity's distributed lock.
    ///
    /// The entity is re-read fresh inside the critical section, so the
    /// closure always sees the latest committed state and lost updates
    /// cannot occur. Identity and `create_time` are restored afterwards
    /// no matter what the closure did to them.
    pub fn update_locked<F>(&self, id: EntityId, timeout: Duration, mutate: F) -> CoreResult<E>
    where
        F: FnOnce(&mut E) -> CoreResult<()>,
    {
        let token = self.lock_entity(id, timeout)?;
        let result = self.locked_mutation(id, mutate);
        if let Err(err) = self.locks.release(&token) {
            warn!(key = token.key(), %err, "failed to release entity lock");
        }
        result
    }

    fn locked_mutation<F>(&self, id: EntityId, mutate: F) -> CoreResult<E>
    where
        F: FnOnce(&mut E) -> CoreResult<()>,
    {
        let mut stored = self.fetch_visible(id)?;
        let original = stored.base().clone();

        mutate(&mut stored)?;

        let base = stored.base_mut();
        base.id = original.id;
        base.create_time = original.create_time;
        restamp(base);

        self.check_unique(&stored, Some(id))?;
        self.store.replace(id, stored.clone())?;

        self.dispatch_post(
            &stored,
            &[
                self.hooks.after_update.clone(),
                self.hooks.after_saved.clone(),
            ],
        );
        Ok(stored)
    }

    // ---- internals -----------------------------------------------------

    fn fetch_visible(&self, id: EntityId) -> CoreResult<E> {
        let entity = self
            .store
            .get(id)?
            .ok_or_else(|| CoreError::not_found(E::collection(), id.raw()))?;
        if self.config.soft_delete && entity.base().is_disabled == Some(true) {
            return Err(CoreError::not_found(E::collection(), id.raw()));
        }
        Ok(entity)
    }

    fn check_unique(&self, candidate: &E, own_id: Option<EntityId>) -> CoreResult<()> {
        let descriptor = self.registry.describe::<E>();
        for field in descriptor.unique_columns() {
            let value = candidate.field(&field.name);
            if value.is_null() {
                continue;
            }
            if let Some(existing) = self
                .store
                .find_one(&[Condition::eq(&field.name, value.clone())])?
            {
                if existing.base().id != own_id {
                    return Err(CoreError::duplicate(&field.name, value.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Fires post-write hooks off the caller's thread, in order, with
    /// failures logged and swallowed.
    fn dispatch_post(&self, entity: &E, hooks: &[Option<AfterHook<E>>]) {
        let hooks: Vec<AfterHook<E>> = hooks.iter().filter_map(Clone::clone).collect();
        if hooks.is_empty() {
            return;
        }
        let entity = entity.clone();
        self.runner.run_async(Box::new(move || {
            for hook in hooks {
                if let Err(err) = hook(&entity) {
                    warn!(collection = E::collection(), %err, "post-write hook failed");
                }
            }
        }));
    }
}

impl<E: Entity> std::fmt::Debug for EntityService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityService")
            .field("collection", &E::collection())
            .field("soft_delete", &self.config.soft_delete)
            .finish_non_exhaustive()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Restamps `update_time`, strictly after the previous stamp even when
/// the clock has not ticked between writes.
fn restamp(base: &mut EntityBase) {
    let previous = base.update_time.unwrap_or_default();
    base.update_time = Some(now_millis().max(previous + 1));
}

fn apply_update<E: Entity>(
    mut stored: E,
    patch: &E,
    mode: &UpdateMode,
    descriptor: &EntityDescriptor,
) -> E {
    match mode {
        UpdateMode::Overwrite => {
            for field in &descriptor.fields {
                stored.set(&field.name, patch.get(&field.name));
            }
        }
        UpdateMode::Merge { null_fields } => {
            for field in &descriptor.fields {
                let value = patch.get(&field.name);
                if !value.is_null() {
                    stored.set(&field.name, value);
                }
            }
            for name in null_fields {
                stored.set(name, FieldValue::Null);
            }
        }
    }
    // Base fields: id, create_time, and is_disabled stay as stored;
    // only update_time moves.
    restamp(stored.base_mut());
    stored
}
