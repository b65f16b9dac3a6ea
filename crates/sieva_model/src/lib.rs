//! # Sieva Model
//!
//! Shared value, metadata, and query types for Sieva.
//!
//! This crate is the leaf of the workspace: both the storage boundary
//! and the engine depend on it. It provides:
//! - [`FieldValue`] / [`FieldMap`] - the dynamic field value model
//! - [`EntityId`] / [`EntityBase`] / [`Entity`] - entity identity and shape
//! - [`FieldDescriptor`] / [`FieldRole`] - per-field search metadata
//! - [`Condition`] / [`OrderKey`] / [`Query`] - the abstract query IR
//!
//! Entities describe their own fields through an explicit descriptor
//! table instead of runtime reflection, so classification happens once
//! per type and every engine decision is a table lookup.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod descriptor;
mod entity;
mod query;
mod value;

pub use descriptor::{FieldDescriptor, FieldRole, SearchMode};
pub use entity::{
    Entity, EntityBase, EntityId, FieldRead, FIELD_CREATE_TIME, FIELD_ID, FIELD_IS_DISABLED,
    FIELD_UPDATE_TIME,
};
pub use query::{Compare, Condition, MatchMode, OrderKey, PageResult, Query};
pub use value::{FieldMap, FieldValue};
