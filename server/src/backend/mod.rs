//! # Backend Module
//!
//! Everything behind the HTTP listener of the commerce/accounting server.
//!
//! This module serves as the orchestration layer that brings together:
//! - **Storage**: Two SQLite databases (ACCOUNT and COMMERCE) behind one `StorageRouter`
//! - **Domain**: Entity catalog, payload validation and the model/sales services
//! - **IO**: REST API exposing the services under `/api/v1`
//! - **Config**: Startup configuration from the environment
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (validation, services)
//!     ↓
//! Storage Layer (registry, router, sessions)
//! ```
//!
//! ## Key Responsibilities
//!
//! - Build the entity registry and open both database sessions
//! - Set up the REST API router with CORS and request tracing
//! - Close both sessions once the server stops

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{http::Method, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::config::Config;
use crate::backend::domain::{models, ModelService, SalesService};
use crate::backend::storage::{DatabaseTargets, StorageRouter};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<StorageRouter>,
    pub model_service: ModelService,
    pub sales_service: SalesService,
}

impl AppState {
    pub fn new(router: Arc<StorageRouter>) -> Self {
        Self {
            model_service: ModelService::new(router.clone()),
            sales_service: SalesService::new(router.clone()),
            router,
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &Config) -> Result<AppState> {
    info!("Starting backend ({} environment)", config.environment);
    open_storage(config.database_targets()).await
}

async fn open_storage(targets: DatabaseTargets) -> Result<AppState> {
    info!("Building entity registry");
    let registry = Arc::new(models::registry()?);
    info!("Registered {} entity types", registry.len());

    info!("Setting up databases");
    let router = Arc::new(StorageRouter::new(registry, targets));
    router.initialize_sessions().await?;

    info!("Setting up application state");
    Ok(AppState::new(router))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .merge(io::status_apis::router())
        .merge(io::model_apis::router())
        .merge(io::sales_apis::router());

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
