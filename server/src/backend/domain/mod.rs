//! # Domain Module
//!
//! Business logic of the commerce/accounting backend, independent of HTTP.
//!
//! ## Module Organization
//!
//! - **models**: Static descriptors of every persisted entity, per physical database
//! - **validation**: Payload schemas derived from those descriptors
//! - **model_service**: Generic create/delete/list/count by model identifier
//! - **sales_service**: Sales recording (header plus lines in one batch)
//!
//! ## Business Rules
//!
//! - Payloads are validated in full before anything is staged
//! - Every request that writes commits exactly once; a rejected commit leaves no trace
//! - Bulk deletes address rows by a single-column primary key only

pub mod model_service;
pub mod models;
pub mod sales_service;
pub mod validation;

pub use model_service::{ModelError, ModelService};
pub use sales_service::SalesService;
pub use validation::{Schema, ValidationErrors};
