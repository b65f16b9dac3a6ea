//! # Sieva Storage
//!
//! Collaborator boundary traits and reference implementations for Sieva.
//!
//! The engine never talks to a database, cache, or filesystem directly.
//! It emits abstract queries and status writes through three narrow
//! boundaries defined here:
//!
//! - [`EntityStore`] - executes compiled queries, returns pages + totals
//! - [`KeyValueStore`] - TTL'd opaque key-value slots (export status,
//!   distributed locks)
//! - [`RowSink`] / [`ExportSinkFactory`] - append-only row output for
//!   bulk export
//!
//! ## Reference implementations
//!
//! - [`MemoryStore`] - thread-safe in-memory entity store
//! - [`MemoryKvStore`] - in-memory key-value store with lazy expiry
//! - [`FileRowSink`] / [`MemoryRowSink`] - CSV row sinks
//!
//! The in-memory implementations are suitable for tests and for embedded
//! use; production deployments substitute their own backends behind the
//! same traits.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod kv;
mod sink;
mod store;

pub use error::{StorageError, StorageResult};
pub use kv::{KeyValueStore, MemoryKvStore};
pub use sink::{ExportSinkFactory, FileRowSink, FileSinkFactory, MemoryRowSink, RowSink};
pub use store::{EntityStore, MemoryStore};
