//! # Sieva Core
//!
//! The metadata-driven query compiler and entity lifecycle engine.
//!
//! Sieva turns a per-type descriptor table into consistent data-access
//! behavior: any type implementing `Entity` gets filtered search,
//! deterministic sorted pagination, validated create/update/delete,
//! soft delete, lock-guarded mutation, and asynchronous CSV export,
//! without writing per-type query code.
//!
//! ## Layers
//!
//! - [`Registry`] - memoized per-type field classification
//! - [`query`] - pure compilers: filter entity to conditions, sort
//!   request to order keys, page request to offset/limit
//! - [`EntityService`] - the lifecycle engine over an injected
//!   [`EntityStore`](sieva_storage::EntityStore)
//! - [`LockManager`] - poll-based distributed locks over a
//!   [`KeyValueStore`](sieva_storage::KeyValueStore)
//! - [`Exporter`] - background CSV export with opaque job codes
//!
//! ## Example
//!
//! ```rust
//! use sieva_core::{Config, EntityService, LockManager, Registry};
//! use sieva_core::query::PageRequest;
//! use sieva_core::runner::InlineRunner;
//! use sieva_model::{Entity, EntityBase, FieldDescriptor, FieldValue, SearchMode};
//! use sieva_storage::{EntityStore, MemoryKvStore, MemoryStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Note {
//!     base: EntityBase,
//!     title: Option<String>,
//! }
//!
//! impl Entity for Note {
//!     fn collection() -> &'static str {
//!         "notes"
//!     }
//!     fn descriptors() -> Vec<FieldDescriptor> {
//!         vec![FieldDescriptor::column("title").search(SearchMode::Prefix)]
//!     }
//!     fn base(&self) -> &EntityBase {
//!         &self.base
//!     }
//!     fn base_mut(&mut self) -> &mut EntityBase {
//!         &mut self.base
//!     }
//!     fn get(&self, name: &str) -> FieldValue {
//!         match name {
//!             "title" => FieldValue::text(self.title.as_deref()),
//!             _ => FieldValue::Null,
//!         }
//!     }
//!     fn set(&mut self, name: &str, value: FieldValue) {
//!         if name == "title" {
//!             self.title = value.as_text().map(str::to_string);
//!         }
//!     }
//! }
//!
//! let config = Config::default();
//! let locks = Arc::new(LockManager::new(
//!     Arc::new(MemoryKvStore::new()),
//!     config.lock_poll_interval,
//!     config.lock_ttl,
//! ));
//! let service = EntityService::new(
//!     Arc::new(Registry::new()),
//!     Arc::new(MemoryStore::new()) as Arc<dyn EntityStore<Note>>,
//!     Arc::new(InlineRunner),
//!     locks,
//!     config,
//! );
//!
//! let added = service
//!     .add(Note {
//!         base: EntityBase::new(),
//!         title: Some("Alpha".into()),
//!     })
//!     .unwrap();
//!
//! let mut filter = Note::default();
//! filter.title = Some("Al".into());
//! let page = service.search(&PageRequest::new(filter)).unwrap();
//! assert_eq!(page.total, 1);
//! assert_eq!(page.items[0].base.id, added.base.id);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod export;
mod lock;
pub mod query;
mod registry;
pub mod runner;
mod service;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use export::{Exporter, ExportStatus};
pub use lock::{LockManager, LockToken};
pub use registry::{EntityDescriptor, Registry};
pub use runner::{InlineRunner, TaskRunner, ThreadPoolRunner};
pub use service::{AfterHook, BeforeHook, EntityService, Hooks, LoadHook, UpdateMode};
