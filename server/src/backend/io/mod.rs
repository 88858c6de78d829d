//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain services: routing, JSON
//! (de)serialisation and error translation. Services reach the handlers through axum
//! state; handlers hold no business logic.

pub mod rest;

pub use rest::*;
