//! Payload validation for entity creation.
//!
//! Each entity's schema is derived from its column declarations. A payload is checked as a
//! whole and every problem is reported per field, so clients can fix a form in one round
//! trip. Messages follow the wording existing clients already display.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::backend::storage::{Column, ColumnKind, EntityDescriptor, FieldRule, Record};

pub const MISSING_FIELD: &str = "Missing data for required field.";
pub const NULL_FIELD: &str = "Field may not be null.";
pub const UNKNOWN_FIELD: &str = "Unknown field.";
pub const INVALID_INPUT: &str = "Invalid input type.";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field name → messages. Serialises as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Load-time schema of one entity type
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    entity: &'static EntityDescriptor,
}

impl Schema {
    pub fn for_entity(entity: &'static EntityDescriptor) -> Self {
        Self { entity }
    }

    /// Check `payload` against the entity's columns and produce a record of normalised
    /// values ready for staging.
    pub fn validate(&self, payload: &Value) -> Result<Record, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Value::Object(object) = payload else {
            errors.add("_schema", INVALID_INPUT);
            return Err(errors);
        };

        let mut record = Record::new(self.entity);
        for (field, value) in object {
            let column = match self.entity.column(field) {
                Some(column) if !column.is_server_managed() => column,
                _ => {
                    errors.add(field.as_str(), UNKNOWN_FIELD);
                    continue;
                }
            };
            match load_value(column, value) {
                Ok(value) => record.put(column.name, value),
                Err(message) => errors.add(field.as_str(), message),
            }
        }

        for column in self.entity.columns {
            if column.rule == FieldRule::Required && !object.contains_key(column.name) {
                errors.add(column.name, MISSING_FIELD);
            }
        }

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(errors)
        }
    }

    /// Validate every object of a batch; errors are keyed by position
    pub fn validate_many(
        &self,
        payloads: &[Value],
    ) -> Result<Vec<Record>, BTreeMap<usize, ValidationErrors>> {
        let mut records = Vec::with_capacity(payloads.len());
        let mut failures = BTreeMap::new();
        for (index, payload) in payloads.iter().enumerate() {
            match self.validate(payload) {
                Ok(record) => records.push(record),
                Err(errors) => {
                    failures.insert(index, errors);
                }
            }
        }
        if failures.is_empty() {
            Ok(records)
        } else {
            Err(failures)
        }
    }
}

fn load_value(column: &Column, value: &Value) -> Result<Value, String> {
    if value.is_null() {
        return Err(NULL_FIELD.to_string());
    }
    match column.kind {
        ColumnKind::Integer => load_integer(value).ok_or_else(|| "Not a valid integer.".to_string()),
        ColumnKind::Text(max) => load_text(value, max),
        ColumnKind::Char => load_text(value, Some(1)),
        ColumnKind::Boolean => load_boolean(value).ok_or_else(|| "Not a valid boolean.".to_string()),
        ColumnKind::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
            .map(|d| Value::from(d.format(DATE_FORMAT).to_string()))
            .ok_or_else(|| "Not a valid date.".to_string()),
        ColumnKind::Time => value
            .as_str()
            .and_then(|s| s.trim().parse::<NaiveTime>().ok())
            .map(|t| Value::from(t.format(TIME_FORMAT).to_string()))
            .ok_or_else(|| "Not a valid time.".to_string()),
        ColumnKind::Timestamp => value
            .as_str()
            .and_then(|s| {
                let s = s.trim();
                NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                    .or_else(|_| s.parse::<NaiveDateTime>())
                    .ok()
            })
            .map(|ts| Value::from(ts.format(TIMESTAMP_FORMAT).to_string()))
            .ok_or_else(|| "Not a valid datetime.".to_string()),
        ColumnKind::Enumeration(variants) => match value.as_str() {
            Some(s) if variants.contains(&s) => Ok(Value::from(s)),
            _ => Err(format!("Must be one of: {}.", variants.join(", "))),
        },
    }
}

fn load_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Value::from(i));
            }
            let f = n.as_f64()?;
            (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| Value::from(f as i64))
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn load_text(value: &Value, max: Option<usize>) -> Result<Value, String> {
    let Some(s) = value.as_str() else {
        return Err("Not a valid string.".to_string());
    };
    match max {
        Some(max) if s.chars().count() > max => Err(format!("Longer than maximum length {}.", max)),
        _ => Ok(Value::from(s)),
    }
}

fn load_boolean(value: &Value) -> Option<Value> {
    let b = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64()? {
            1 => true,
            0 => false,
            _ => return None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Bool(b))
}

/// JSON objects of a create body: a single object or an array of them
pub fn payload_objects(body: &Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::{account, commerce};
    use serde_json::json;

    fn item_payload() -> Value {
        json!({
            "item_name": "Widget",
            "item_cat": 1,
            "cost_price": 100,
            "selling_price": 150,
            "min_sell_price": 120,
            "min_order_qty": 5,
            "family": 1,
            "sector": 1
        })
    }

    #[test]
    fn test_valid_payload_becomes_record() {
        let record = Schema::for_entity(&commerce::ITEM)
            .validate(&item_payload())
            .expect("payload is valid");
        assert_eq!(record.get("item_name"), Some(&json!("Widget")));
        assert_eq!(record.get("id"), None);
    }

    #[test]
    fn test_missing_required_fields_reported_together() {
        let errors = Schema::for_entity(&commerce::ITEM)
            .validate(&json!({"item_name": "Widget"}))
            .unwrap_err();
        for field in ["item_cat", "cost_price", "selling_price", "family", "sector"] {
            assert_eq!(errors.messages(field), [MISSING_FIELD], "{}", field);
        }
        assert!(errors.messages("is_active").is_empty());
    }

    #[test]
    fn test_unknown_and_server_managed_fields_rejected() {
        let mut payload = item_payload();
        payload["colour"] = json!("red");
        payload["datetime"] = json!("2024-01-01 00:00:00");
        let errors = Schema::for_entity(&commerce::ITEM).validate(&payload).unwrap_err();
        assert_eq!(errors.messages("colour"), [UNKNOWN_FIELD]);
        assert_eq!(errors.messages("datetime"), [UNKNOWN_FIELD]);
    }

    #[test]
    fn test_type_coercion_and_messages() {
        let schema = Schema::for_entity(&commerce::ITEM);

        let mut payload = item_payload();
        payload["cost_price"] = json!("250");
        payload["is_active"] = json!("false");
        let record = schema.validate(&payload).unwrap();
        assert_eq!(record.get("cost_price"), Some(&json!(250)));
        assert_eq!(record.get("is_active"), Some(&json!(false)));

        let mut payload = item_payload();
        payload["cost_price"] = json!("cheap");
        payload["is_metered"] = json!("maybe");
        payload["item_name"] = json!(42);
        payload["family"] = Value::Null;
        let errors = schema.validate(&payload).unwrap_err();
        assert_eq!(errors.messages("cost_price"), ["Not a valid integer."]);
        assert_eq!(errors.messages("is_metered"), ["Not a valid boolean."]);
        assert_eq!(errors.messages("item_name"), ["Not a valid string."]);
        assert_eq!(errors.messages("family"), [NULL_FIELD]);
    }

    #[test]
    fn test_dates_times_and_enumerations() {
        let errors = Schema::for_entity(&account::EXPENSE)
            .validate(&json!({
                "UserID": 1,
                "CategoryID": 1,
                "Amount": 300,
                "Date": "2024-02-30",
                "Time": "25:00:00"
            }))
            .unwrap_err();
        assert_eq!(errors.messages("Date"), ["Not a valid date."]);
        assert_eq!(errors.messages("Time"), ["Not a valid time."]);

        let errors = Schema::for_entity(&account::CATEGORY)
            .validate(&json!({"Name": "Food", "Type": "Gift"}))
            .unwrap_err();
        assert_eq!(errors.messages("Type"), ["Must be one of: Expense, Income."]);
    }

    #[test]
    fn test_length_limits() {
        let errors = Schema::for_entity(&commerce::OPERATION)
            .validate(&json!({"op_name": "Sale", "op_sign": "+-", "op_desc": "Sale"}))
            .unwrap_err();
        assert_eq!(errors.messages("op_sign"), ["Longer than maximum length 1."]);
    }

    #[test]
    fn test_non_object_payload() {
        let errors = Schema::for_entity(&commerce::ITEM).validate(&json!([1, 2])).unwrap_err();
        assert_eq!(errors.messages("_schema"), [INVALID_INPUT]);
    }

    #[test]
    fn test_batch_errors_keyed_by_position() {
        let payloads = vec![item_payload(), json!({"item_name": "Gadget"})];
        let failures = Schema::for_entity(&commerce::ITEM)
            .validate_many(&payloads)
            .unwrap_err();
        assert_eq!(failures.keys().copied().collect::<Vec<_>>(), vec![1]);
        let detail = serde_json::to_value(&failures).unwrap();
        assert_eq!(detail["1"]["family"], json!([MISSING_FIELD]));
    }
}
