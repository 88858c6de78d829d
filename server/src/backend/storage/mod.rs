//! # Storage Module
//!
//! Handles all persistence for the commerce/accounting backend.
//!
//! Two physical SQLite databases sit behind one interface: the ACCOUNT database (users,
//! account types, personal finance) and the COMMERCE database (inventory, suppliers, sales,
//! payments). Callers never pick a connection themselves; the [`StorageRouter`] maps each
//! entity type to the session that owns it.
//!
//! ## Key Responsibilities
//!
//! - **Schema Metadata**: Static entity descriptors and the DDL generated from them
//! - **Type Resolution**: The [`EntityRegistry`] maps route identifiers to descriptors
//! - **Session Management**: One long-lived transactional session per database
//! - **Batch Semantics**: Writes are staged and become durable only on commit; a failed
//!   commit discards the whole batch
//! - **Test Fixtures**: `truncate_all` wipes a table with constraint checks suspended
//!
//! ## Design Notes
//!
//! - Foreign keys are deferred to commit so a batch is judged as a whole
//! - Uniqueness failures surface while staging; they poison the batch and are reported by
//!   the next commit so callers see one all-or-nothing outcome
//! - Record keys keep the legacy `"{TypeName}.{pk1-pk2}"` rendering for clients

pub mod error;
pub mod record;
pub mod registry;
pub mod router;
pub mod schema;
pub mod session;

pub use error::StorageError;
pub use record::{Record, RecordKey};
pub use registry::{EntityRegistry, RegistryError};
pub use router::{DatabaseTargets, StorageRouter};
pub use schema::{
    Column, ColumnKind, ComputedColumn, EntityDescriptor, FieldRule, PhysicalDatabase,
};
pub use session::{Batch, Session};
