//! Translation of domain failures into HTTP status codes and `ErrorResponse` bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use tracing::error;

use crate::backend::domain::ModelError;
use crate::backend::storage::{RegistryError, StorageError};
use shared::ErrorResponse;

pub const INVALID_JSON: &str = "Valid JSON data required";
pub const MODEL_REQUIRED: &str = "Model is required";

/// Mapper from [`ModelError`] to HTTP responses.
pub struct ErrorMapper;

impl ErrorMapper {
    pub fn status(err: &ModelError) -> StatusCode {
        match err {
            ModelError::Registry(RegistryError::UnknownEntityType(_)) => StatusCode::NOT_FOUND,
            ModelError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ModelError::ValidationFailure { .. } | ModelError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            ModelError::Conflict { .. } => StatusCode::CONFLICT,
            ModelError::Storage(StorageError::LookupKeyError { .. })
            | ModelError::Storage(StorageError::UnknownColumn { .. }) => StatusCode::BAD_REQUEST,
            ModelError::Storage(StorageError::IntegrityViolation { .. }) => StatusCode::CONFLICT,
            ModelError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_dto(err: &ModelError) -> ErrorResponse {
        match err {
            ModelError::Registry(RegistryError::UnknownEntityType(model)) => {
                ErrorResponse::new(format!("Model `{}`", model))
            }
            ModelError::ValidationFailure { detail, .. } => {
                ErrorResponse::with_detail(err.to_string(), detail.clone())
            }
            ModelError::Conflict { model, source } => Self::conflict_dto(model, source),
            ModelError::Storage(StorageError::PreconditionViolation(_))
            | ModelError::Storage(StorageError::Database(_))
            | ModelError::Registry(_) => ErrorResponse::new("Internal server error"),
            other => ErrorResponse::new(other.to_string()),
        }
    }

    fn conflict_dto(model: &str, source: &StorageError) -> ErrorResponse {
        match source {
            StorageError::IntegrityViolation {
                detail: Some(values),
                ..
            } => ErrorResponse::new(format!(
                "Resource(s) already exists in Model `{}`, check value(s) `{}`",
                model, values
            )),
            StorageError::IntegrityViolation { message, .. } => ErrorResponse::with_detail(
                format!("Integrity violation in Model `{}`", model),
                Value::String(message.clone()),
            ),
            other => ErrorResponse::new(format!("Model `{}`: {}", model, other)),
        }
    }

    pub fn to_response(err: ModelError) -> Response {
        let status = Self::status(&err);
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }
        (status, Json(Self::to_dto(&err))).into_response()
    }

    pub fn bad_request(message: &str) -> Response {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::PhysicalDatabase;

    fn unique_violation(detail: Option<&str>) -> StorageError {
        StorageError::IntegrityViolation {
            database: PhysicalDatabase::Commerce,
            table: Some("item".to_string()),
            message: "UNIQUE constraint failed: item.item_name".to_string(),
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn test_unknown_model_is_not_found() {
        let err = ModelError::Registry(RegistryError::UnknownEntityType("frobnicate".into()));
        assert_eq!(ErrorMapper::status(&err), StatusCode::NOT_FOUND);
        assert_eq!(ErrorMapper::to_dto(&err).message, "Model `frobnicate`");
    }

    #[test]
    fn test_conflict_names_model_and_value() {
        let err = ModelError::from_storage("item", unique_violation(Some("item_name=Widget")));
        assert_eq!(ErrorMapper::status(&err), StatusCode::CONFLICT);
        assert_eq!(
            ErrorMapper::to_dto(&err).message,
            "Resource(s) already exists in Model `item`, check value(s) `item_name=Widget`"
        );
    }

    #[test]
    fn test_conflict_without_parsed_value_keeps_store_message() {
        let err = ModelError::from_storage("item", unique_violation(None));
        let dto = ErrorMapper::to_dto(&err);
        assert_eq!(dto.message, "Integrity violation in Model `item`");
        assert_eq!(
            dto.detail,
            Some(Value::String("UNIQUE constraint failed: item.item_name".into()))
        );
    }

    #[test]
    fn test_lookup_key_error_is_bad_request() {
        let err = ModelError::Storage(StorageError::LookupKeyError {
            entity: "depot".into(),
            reason: "composite".into(),
        });
        assert_eq!(ErrorMapper::status(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_precondition_is_server_error() {
        let err = ModelError::Storage(StorageError::precondition("storage used after shutdown"));
        assert_eq!(ErrorMapper::status(&err), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorMapper::to_dto(&err).message, "Internal server error");
    }
}
