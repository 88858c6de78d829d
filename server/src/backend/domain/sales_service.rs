use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::model_service::ModelError;
use super::validation::{Schema, ValidationErrors};
use crate::backend::storage::{EntityDescriptor, Record, StorageError, StorageRouter};
use shared::SaleRequest;

/// Identifier of the sale header entity
pub const SALE_DETAIL_MODEL: &str = "record_detail";
/// Identifier of the sale line entity
pub const SALE_LINE_MODEL: &str = "record";

/// Records sales: one `record_detail` header plus its `record` lines per sale
#[derive(Clone)]
pub struct SalesService {
    router: Arc<StorageRouter>,
}

struct ValidatedSale {
    detail: Record,
    lines: Vec<Record>,
}

impl SalesService {
    pub fn new(router: Arc<StorageRouter>) -> Self {
        Self { router }
    }

    /// Validate every sale, then stage all headers and lines and commit them together.
    ///
    /// Headers and lines share the COMMERCE database, so either every sale of the request
    /// is stored or none is. Returns the number of sales recorded.
    pub async fn sell(&self, sales: Vec<SaleRequest>) -> Result<usize, ModelError> {
        let registry = self.router.registry();
        let detail_entity = registry.resolve(SALE_DETAIL_MODEL)?;
        let line_entity = registry.resolve(SALE_LINE_MODEL)?;

        let validated = Self::validate_sales(detail_entity, line_entity, &sales)?;

        let database = self.router.resolve_database(detail_entity)?;
        let line_database = self.router.resolve_database(line_entity)?;
        if database != line_database {
            return Err(StorageError::precondition(format!(
                "sale headers ({}) and lines ({}) must share a database",
                database, line_database
            ))
            .into());
        }

        info!("Recording {} sale(s)", validated.len());
        let mut batch = self.router.begin(database).await?;
        for mut sale in validated {
            let staged = async {
                self.router.insert(&mut batch, &mut sale.detail).await?;
                for line in sale.lines.iter_mut() {
                    self.router.insert(&mut batch, line).await?;
                }
                Ok::<(), StorageError>(())
            }
            .await;
            if let Err(e) = staged {
                self.router.rollback(batch).await;
                return Err(ModelError::from_storage(SALE_DETAIL_MODEL, e));
            }
        }

        self.router
            .commit(batch)
            .await
            .map_err(|e| ModelError::from_storage(SALE_DETAIL_MODEL, e))?;

        info!("Recorded {} sale(s)", sales.len());
        Ok(sales.len())
    }

    fn validate_sales(
        detail_entity: &'static EntityDescriptor,
        line_entity: &'static EntityDescriptor,
        sales: &[SaleRequest],
    ) -> Result<Vec<ValidatedSale>, ModelError> {
        let detail_schema = Schema::for_entity(detail_entity);
        let line_schema = Schema::for_entity(line_entity);

        let mut validated = Vec::with_capacity(sales.len());
        let mut failures: BTreeMap<usize, Value> = BTreeMap::new();

        for (index, sale) in sales.iter().enumerate() {
            let detail = detail_schema.validate(&Value::Object(sale.details.clone()));
            let lines: Vec<Value> = sale.records.iter().cloned().map(Value::Object).collect();
            let lines = line_schema.validate_many(&lines);

            match (detail, lines) {
                (Ok(detail), Ok(lines)) => validated.push(ValidatedSale { detail, lines }),
                (detail, lines) => {
                    failures.insert(index, sale_errors(detail.err(), lines.err()));
                }
            }
        }

        if failures.is_empty() {
            return Ok(validated);
        }
        let detail = if sales.len() == 1 {
            failures.remove(&0).unwrap_or_default()
        } else {
            serde_json::to_value(failures).unwrap_or_default()
        };
        Err(ModelError::ValidationFailure {
            model: SALE_DETAIL_MODEL.to_string(),
            detail,
        })
    }
}

fn sale_errors(
    detail: Option<ValidationErrors>,
    lines: Option<BTreeMap<usize, ValidationErrors>>,
) -> Value {
    let mut errors = Map::new();
    if let Some(detail) = detail {
        errors.insert(
            "details".to_string(),
            serde_json::to_value(detail).unwrap_or_default(),
        );
    }
    if let Some(lines) = lines {
        errors.insert(
            "records".to_string(),
            serde_json::to_value(lines).unwrap_or_default(),
        );
    }
    Value::Object(errors)
}
