//! # Entity Catalog
//!
//! Static descriptors for every persisted entity, split by the physical database that owns
//! them. [`registry`] assembles the single immutable registry the backend is built on.

pub mod account;
pub mod commerce;

use crate::backend::storage::{EntityDescriptor, EntityRegistry, RegistryError};

/// Every entity, ACCOUNT first, each database in creation order
pub fn catalog() -> impl Iterator<Item = &'static EntityDescriptor> {
    account::entities().into_iter().chain(commerce::entities())
}

pub fn registry() -> Result<EntityRegistry, RegistryError> {
    EntityRegistry::new(catalog())
}
