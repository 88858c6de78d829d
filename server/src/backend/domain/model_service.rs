use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::validation::{payload_objects, Schema};
use crate::backend::storage::{
    EntityDescriptor, PhysicalDatabase, Record, RecordKey, RegistryError, StorageError,
    StorageRouter,
};

/// Failures of the model-level operations, each carrying enough context for an HTTP reply
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Error(s) found in data for Model `{model}`, see details")]
    ValidationFailure { model: String, detail: Value },

    #[error("{0}")]
    MissingField(String),

    /// The store rejected the batch; nothing from the request was persisted
    #[error("Model `{model}`: {source}")]
    Conflict {
        model: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ModelError {
    /// Wrap a storage failure, singling out integrity violations for `model`
    pub fn from_storage(model: &str, err: StorageError) -> Self {
        if err.is_integrity_violation() {
            ModelError::Conflict {
                model: model.to_string(),
                source: err,
            }
        } else {
            ModelError::Storage(err)
        }
    }
}

/// Generic create/delete/list/count over every registered entity type
#[derive(Clone)]
pub struct ModelService {
    router: Arc<StorageRouter>,
}

impl ModelService {
    pub fn new(router: Arc<StorageRouter>) -> Self {
        Self { router }
    }

    pub fn resolve(&self, identifier: &str) -> Result<&'static EntityDescriptor, ModelError> {
        Ok(self.router.registry().resolve(identifier)?)
    }

    /// Validate and insert one object or an array of objects as one batch.
    ///
    /// Nothing is staged unless every object validates. Returns the stored records with
    /// generated keys filled in.
    pub async fn create(&self, identifier: &str, body: &Value) -> Result<Vec<Record>, ModelError> {
        let entity = self.resolve(identifier)?;
        let schema = Schema::for_entity(entity);

        let mut records = match body {
            Value::Array(_) => {
                schema
                    .validate_many(&payload_objects(body))
                    .map_err(|failures| ModelError::ValidationFailure {
                        model: identifier.to_string(),
                        detail: serde_json::to_value(failures).unwrap_or_default(),
                    })?
            }
            _ => vec![schema.validate(body).map_err(|errors| ModelError::ValidationFailure {
                model: identifier.to_string(),
                detail: serde_json::to_value(errors).unwrap_or_default(),
            })?],
        };

        info!("Creating {} `{}` record(s)", records.len(), identifier);
        let database = self.router.resolve_database(entity)?;
        let mut batch = self.router.begin(database).await?;
        for record in records.iter_mut() {
            if let Err(e) = self.router.insert(&mut batch, record).await {
                self.router.rollback(batch).await;
                return Err(ModelError::from_storage(identifier, e));
            }
        }
        self.router
            .commit(batch)
            .await
            .map_err(|e| ModelError::from_storage(identifier, e))?;

        info!("Created {} `{}` record(s)", records.len(), identifier);
        Ok(records)
    }

    /// Delete the rows whose single-column primary key is in `ids`, as one batch.
    ///
    /// Ids with no matching row are skipped, so repeating a request is harmless. If the
    /// commit is rejected none of the deletions take effect. Returns the number of rows
    /// staged for deletion.
    pub async fn delete_by_ids(&self, identifier: &str, ids: &[Value]) -> Result<usize, ModelError> {
        let entity = self.resolve(identifier)?;
        if entity.is_composite_key() {
            return Err(StorageError::LookupKeyError {
                entity: identifier.to_string(),
                reason: format!(
                    "composite primary key ({}) cannot be addressed by a single id",
                    entity.primary_key.join(", ")
                ),
            }
            .into());
        }

        let database = self.router.resolve_database(entity)?;
        let key_field = entity.primary_key[0];
        info!("Deleting {} `{}` id(s)", ids.len(), identifier);

        let mut batch = self.router.begin(database).await?;
        let mut staged = 0;
        for id in ids {
            let mut key = Map::new();
            key.insert(key_field.to_string(), id.clone());

            let outcome = match self.router.lookup_in(&mut batch, entity, &key).await {
                Ok(Some(record)) => {
                    staged += 1;
                    self.router.delete(&mut batch, Some(&record)).await
                }
                Ok(None) => {
                    warn!("No `{}` with {} = {}; skipping", identifier, key_field, id);
                    Ok(())
                }
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                self.router.rollback(batch).await;
                return Err(ModelError::from_storage(identifier, e));
            }
        }

        self.router
            .commit(batch)
            .await
            .map_err(|e| ModelError::from_storage(identifier, e))?;

        info!("Deleted {} `{}` record(s)", staged, identifier);
        Ok(staged)
    }

    /// Every row of the model, read from its own database
    pub async fn list(&self, identifier: &str) -> Result<BTreeMap<RecordKey, Record>, ModelError> {
        let entity = self.resolve(identifier)?;
        let database = self.router.resolve_database(entity)?;
        Ok(self.router.fetch_all(Some(entity), database).await?)
    }

    /// Row count of one model, or of all models, as seen from `database`
    pub async fn count(
        &self,
        identifier: Option<&str>,
        database: PhysicalDatabase,
    ) -> Result<usize, ModelError> {
        let entity = identifier.map(|id| self.resolve(id)).transpose()?;
        Ok(self.router.count(entity, database).await?)
    }
}
