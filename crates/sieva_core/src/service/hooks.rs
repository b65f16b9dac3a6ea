//! Lifecycle hook points.

use crate::error::CoreResult;
use crate::query::ConditionHook;
use sieva_model::Entity;
use std::sync::Arc;

/// A synchronous pre-write hook. May mutate the entity and may veto the
/// operation by returning an error.
pub type BeforeHook<E> = Arc<dyn Fn(&mut E) -> CoreResult<()> + Send + Sync>;

/// An asynchronous post-write hook. Runs after the write is durably
/// committed, off the caller's thread; failures are logged, never
/// propagated, and never roll back the write.
pub type AfterHook<E> = Arc<dyn Fn(&E) -> CoreResult<()> + Send + Sync>;

/// A synchronous post-read hook applied to every entity the read path
/// returns, for decoration.
pub type LoadHook<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

/// The hook points of one entity service.
///
/// All hooks are optional. Post-write hooks fire in a fixed order: the
/// operation-specific hook first, then the generic `after_saved` (which
/// deletes do not trigger).
pub struct Hooks<E: Entity> {
    /// Before an add, on the incoming entity.
    pub before_add: Option<BeforeHook<E>>,
    /// After an add commits.
    pub after_add: Option<AfterHook<E>>,
    /// Before an update, on the incoming patch.
    pub before_update: Option<BeforeHook<E>>,
    /// After an update commits.
    pub after_update: Option<AfterHook<E>>,
    /// Before a delete, on the stored entity.
    pub before_delete: Option<BeforeHook<E>>,
    /// After a delete commits.
    pub after_delete: Option<AfterHook<E>>,
    /// Before an enable, on the stored entity.
    pub before_enable: Option<BeforeHook<E>>,
    /// After an enable commits.
    pub after_enable: Option<AfterHook<E>>,
    /// Before a disable, on the stored entity.
    pub before_disable: Option<BeforeHook<E>>,
    /// After a disable commits.
    pub after_disable: Option<AfterHook<E>>,
    /// After any add, update, enable, or disable commits.
    pub after_saved: Option<AfterHook<E>>,
    /// Applied to every entity returned by the read path.
    pub after_load: Option<LoadHook<E>>,
    /// Customizes compiled search conditions.
    pub conditions: Option<Arc<dyn ConditionHook<E>>>,
}

impl<E: Entity> Default for Hooks<E> {
    fn default() -> Self {
        Self {
            before_add: None,
            after_add: None,
            before_update: None,
            after_update: None,
            before_delete: None,
            after_delete: None,
            before_enable: None,
            after_enable: None,
            before_disable: None,
            after_disable: None,
            after_saved: None,
            after_load: None,
            conditions: None,
        }
    }
}

impl<E: Entity> Hooks<E> {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the before-add hook.
    #[must_use]
    pub fn before_add(mut self, f: impl Fn(&mut E) -> CoreResult<()> + Send + Sync + 'static) -> Self {
        self.before_add = Some(Arc::new(f));
        self
    }

    /// Sets the after-add hook.
    #[must_use]
    pub fn after_add(mut self, f: impl Fn(&E) -> CoreResult<()> + Send + Sync + 'static) -> Self {
        self.after_add = Some(Arc::new(f));
        self
    }

    /// Sets the before-update hook.
    #[must_use]
    pub fn before_update(
        mut self,
        f: impl Fn(&mut E) -> CoreResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.before_update = Some(Arc::new(f));
        self
    }

    /// Sets the after-update hook.
    #[must_use]
    pub fn after_update(mut self, f: impl Fn(&E) -> CoreResult<()> + Send + Sync + 'static) -> Self {
        self.after_update = Some(Arc::new(f));
        self
    }

    /// Sets the before-delete hook.
    #[must_use]
    pub fn before_delete(
        mut self,
        f: impl Fn(&mut E) -> CoreResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.before_delete = Some(Arc::new(f));
        self
    }

    /// Sets the after-delete hook.
    #[must_use]
    pub fn after_delete(mut self, f: impl Fn(&E) -> CoreResult<()> + Send + Sync + 'static) -> Self {
        self.after_delete = Some(Arc::new(f));
        self
    }

    /// Sets the before-enable hook.
    #[must_use]
    pub fn before_enable(
        mut self,
        f: impl Fn(&mut E) -> CoreResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.before_enable = Some(Arc::new(f));
        self
    }

    /// Sets the after-enable hook.
    #[must_use]
    pub fn after_enable(mut self, f: impl Fn(&E) -> CoreResult<()> + Send + Sync + 'static) -> Self {
        self.after_enable = Some(Arc::new(f));
        self
    }

    /// Sets the before-disable hook.
    #[must_use]
    pub fn before_disable(
        mut self,
        f: impl Fn(&mut E) -> CoreResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.before_disable = Some(Arc::new(f));
        self
    }

    /// Sets the after-disable hook.
    #[must_use]
    pub fn after_disable(mut self, f: impl Fn(&E) -> CoreResult<()> + Send + Sync + 'static) -> Self {
        self.after_disable = Some(Arc::new(f));
        self
    }

    /// Sets the generic after-saved hook.
    #[must_use]
    pub fn after_saved(mut self, f: impl Fn(&E) -> CoreResult<()> + Send + Sync + 'static) -> Self {
        self.after_saved = Some(Arc::new(f));
        self
    }

    /// Sets the post-read decoration hook.
    #[must_use]
    pub fn after_load(mut self, f: impl Fn(&mut E) + Send + Sync + 'static) -> Self {
        self.after_load = Some(Arc::new(f));
        self
    }

    /// Sets the search-condition hook.
    #[must_use]
    pub fn conditions(mut self, hook: impl ConditionHook<E> + 'static) -> Self {
        self.conditions = Some(Arc::new(hook));
        self
    }
}

impl<E: Entity> std::fmt::Debug for Hooks<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before_add", &self.before_add.is_some())
            .field("after_add", &self.after_add.is_some())
            .field("after_saved", &self.after_saved.is_some())
            .field("after_load", &self.after_load.is_some())
            .finish_non_exhaustive()
    }
}
