use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Body of `POST /api/v1/delete/<model>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Primary key values of the rows to delete, in request order
    pub ids: Vec<Value>,
}

/// Error body returned for every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    /// Per-field validation messages, present only for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(message: impl Into<String>, detail: Value) -> Self {
        Self {
            message: message.into(),
            detail: Some(detail),
        }
    }
}

/// Response of the count endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountResponse {
    /// Database the count was taken against ("account" or "commerce")
    pub database: String,
    /// Model identifier when a single model was counted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub count: usize,
}

/// Query string accepted by the count endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountQuery {
    pub db: Option<String>,
}

/// One sale: a record detail header plus its record lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub details: Map<String, Value>,
    pub records: Vec<Map<String, Value>>,
}

/// Body of `POST /api/v1/sell`; either a single sale or a batch of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SalePayload {
    One(SaleRequest),
    Many(Vec<SaleRequest>),
}

impl SalePayload {
    pub fn into_sales(self) -> Vec<SaleRequest> {
        match self {
            SalePayload::One(sale) => vec![sale],
            SalePayload::Many(sales) => sales,
        }
    }
}

/// Response of `GET /api/v1/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Response of `GET /api/v1/all/<model>`: legacy `"{TypeName}.{pk}"` keys to row objects
pub type RecordListResponse = BTreeMap<String, Value>;
