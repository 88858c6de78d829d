//! Conversions from storage records to response DTOs.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::backend::storage::{Record, RecordKey};
use shared::RecordListResponse;

/// Mapper from storage records to JSON response bodies.
pub struct RecordMapper;

impl RecordMapper {
    /// One record as a JSON object, computed columns included.
    pub fn to_dto(record: &Record) -> Value {
        record.to_json()
    }

    /// Records created by one request: an object for a single-object body, an array
    /// otherwise.
    pub fn to_created_dto(records: &[Record], body_was_array: bool) -> Value {
        if !body_was_array {
            if let [record] = records {
                return Self::to_dto(record);
            }
        }
        Value::Array(records.iter().map(Self::to_dto).collect())
    }

    /// Rows keyed by their legacy `"{TypeName}.{pk}"` string.
    pub fn to_list_dto(rows: &BTreeMap<RecordKey, Record>) -> RecordListResponse {
        rows.iter()
            .map(|(key, record)| (key.to_string(), Self::to_dto(record)))
            .collect()
    }
}
