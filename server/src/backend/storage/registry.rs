//! # Entity Registry
//!
//! Immutable mapping from route identifiers (`"item"`, `"supply_detail"`, ...) to entity
//! descriptors, built once at startup. Each descriptor is tagged with its physical database,
//! so the registry also answers which database governs a type.

use std::collections::HashMap;
use thiserror::Error;

use super::schema::{EntityDescriptor, PhysicalDatabase};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown entity type `{0}`")]
    UnknownEntityType(String),

    #[error("entity identifier `{0}` is registered twice")]
    DuplicateIdentifier(String),

    #[error("entity type name `{0}` is registered twice")]
    DuplicateTypeName(String),
}

#[derive(Debug)]
pub struct EntityRegistry {
    /// Registration order; also the table creation order
    entities: Vec<&'static EntityDescriptor>,
    by_identifier: HashMap<&'static str, &'static EntityDescriptor>,
}

impl EntityRegistry {
    pub fn new(
        entities: impl IntoIterator<Item = &'static EntityDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut ordered = Vec::new();
        let mut by_identifier = HashMap::new();
        let mut type_names = HashMap::new();

        for entity in entities {
            if by_identifier.insert(entity.identifier, entity).is_some() {
                return Err(RegistryError::DuplicateIdentifier(entity.identifier.to_string()));
            }
            if type_names.insert(entity.type_name, entity.identifier).is_some() {
                return Err(RegistryError::DuplicateTypeName(entity.type_name.to_string()));
            }
            ordered.push(entity);
        }

        Ok(Self {
            entities: ordered,
            by_identifier,
        })
    }

    /// Resolve a route identifier to its descriptor
    pub fn resolve(&self, identifier: &str) -> Result<&'static EntityDescriptor, RegistryError> {
        self.by_identifier
            .get(identifier)
            .copied()
            .ok_or_else(|| RegistryError::UnknownEntityType(identifier.to_string()))
    }

    /// True when this exact descriptor is registered
    pub fn contains(&self, entity: &EntityDescriptor) -> bool {
        self.by_identifier
            .get(entity.identifier)
            .is_some_and(|registered| std::ptr::eq(*registered, entity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static EntityDescriptor> + '_ {
        self.entities.iter().copied()
    }

    /// Entities homed in `database`, in registration order
    pub fn for_database(
        &self,
        database: PhysicalDatabase,
    ) -> impl Iterator<Item = &'static EntityDescriptor> + '_ {
        self.iter().filter(move |e| e.database == database)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::schema::{Column, ColumnKind};

    static ID_ONLY: [Column; 1] = [Column::new("id", ColumnKind::Integer)];

    static LEDGER: EntityDescriptor = EntityDescriptor {
        identifier: "ledger",
        type_name: "Ledger",
        database: PhysicalDatabase::Account,
        table_name: "ledger",
        columns: &ID_ONLY,
        primary_key: &["id"],
        auto_increment: true,
        computed: &[],
    };

    static CRATE_BOX: EntityDescriptor = EntityDescriptor {
        identifier: "crate_box",
        type_name: "CrateBox",
        database: PhysicalDatabase::Commerce,
        table_name: "crate_box",
        columns: &ID_ONLY,
        primary_key: &["id"],
        auto_increment: true,
        computed: &[],
    };

    static LEDGER_AGAIN: EntityDescriptor = EntityDescriptor {
        identifier: "ledger",
        type_name: "LedgerCopy",
        database: PhysicalDatabase::Commerce,
        table_name: "ledger_copy",
        columns: &ID_ONLY,
        primary_key: &["id"],
        auto_increment: true,
        computed: &[],
    };

    #[test]
    fn test_resolve_known_and_unknown() {
        let registry = EntityRegistry::new([&LEDGER, &CRATE_BOX]).unwrap();
        assert_eq!(registry.resolve("ledger").unwrap().table_name, "ledger");
        assert_eq!(
            registry.resolve("frobnicate").unwrap_err(),
            RegistryError::UnknownEntityType("frobnicate".to_string())
        );
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let err = EntityRegistry::new([&LEDGER, &LEDGER_AGAIN]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIdentifier("ledger".to_string()));
    }

    #[test]
    fn test_contains_checks_identity() {
        let registry = EntityRegistry::new([&LEDGER]).unwrap();
        assert!(registry.contains(&LEDGER));
        assert!(!registry.contains(&LEDGER_AGAIN));
        assert!(!registry.contains(&CRATE_BOX));
    }

    #[test]
    fn test_for_database_partitions() {
        let registry = EntityRegistry::new([&LEDGER, &CRATE_BOX]).unwrap();
        let account: Vec<_> = registry.for_database(PhysicalDatabase::Account).map(|e| e.identifier).collect();
        let commerce: Vec<_> = registry.for_database(PhysicalDatabase::Commerce).map(|e| e.identifier).collect();
        assert_eq!(account, vec!["ledger"]);
        assert_eq!(commerce, vec!["crate_box"]);
        assert_eq!(registry.len(), 2);
    }
}
