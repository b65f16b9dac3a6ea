//! Filter, sort, and page compilation.
//!
//! The three compilers turn a caller's sparse inputs (a filter entity,
//! an optional sort request, an optional page request) into the
//! deterministic abstract [`Query`](sieva_model::Query) the storage
//! boundary executes. They are pure functions over the registry's
//! metadata; all state lives with the caller.

mod page;
mod predicate;
mod sort;

pub use page::{normalize, Page, PageSpec};
pub use predicate::{compile as compile_conditions, ConditionHook};
pub use sort::{compile as compile_sort, SortSpec};

/// A complete read request: filter entity plus sort and page parameters.
#[derive(Debug, Clone, Default)]
pub struct PageRequest<E> {
    /// Filter entity; unset fields do not constrain.
    pub filter: E,
    /// Requested ordering.
    pub sort: SortSpec,
    /// Requested page.
    pub page: PageSpec,
}

impl<E> PageRequest<E> {
    /// Creates a request with default sort and page parameters.
    #[must_use]
    pub fn new(filter: E) -> Self {
        Self {
            filter,
            sort: SortSpec::default(),
            page: PageSpec::default(),
        }
    }

    /// Sets the sort parameters.
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the page parameters.
    #[must_use]
    pub fn page(mut self, page: PageSpec) -> Self {
        self.page = page;
        self
    }
}
