//! In-memory rows and their composite keys.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::error::StorageError;
use super::schema::EntityDescriptor;

/// Ordered primary-key values of one row, tagged with the entity's type name.
///
/// Displays as the legacy `"{TypeName}.{pk1-pk2-...}"` string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub type_name: &'static str,
    pub parts: Vec<String>,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.parts.join("-"))
    }
}

/// Renders a column value the way it appears inside a record key
pub(crate) fn key_part(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}

/// One row of an entity type.
///
/// Values are keyed by the descriptor's column names, so a record can only ever hold
/// columns its entity declares. Computed columns are derived on read and never stored.
#[derive(Debug, Clone)]
pub struct Record {
    entity: &'static EntityDescriptor,
    values: BTreeMap<&'static str, Value>,
}

impl Record {
    pub fn new(entity: &'static EntityDescriptor) -> Self {
        Self {
            entity,
            values: BTreeMap::new(),
        }
    }

    pub fn entity(&self) -> &'static EntityDescriptor {
        self.entity
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// Assign a stored column. Use [`Record::computed`] for derived columns.
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), StorageError> {
        let column = self.entity.column(field).ok_or_else(|| StorageError::UnknownColumn {
            entity: self.entity.identifier.to_string(),
            column: field.to_string(),
        })?;
        self.values.insert(column.name, value);
        Ok(())
    }

    pub fn with(mut self, field: &str, value: Value) -> Result<Self, StorageError> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Stored columns currently set, in column-name order
    pub fn values(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub(crate) fn put(&mut self, column: &'static str, value: Value) {
        self.values.insert(column, value);
    }

    /// Value of a computed column, evaluated against the current stored values
    pub fn computed(&self, name: &str) -> Option<Value> {
        self.entity
            .computed
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| (c.compute)(self))
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            type_name: self.entity.type_name,
            parts: self
                .entity
                .primary_key
                .iter()
                .map(|k| key_part(self.values.get(k)))
                .collect(),
        }
    }

    /// True when every primary-key column holds a non-null value
    pub fn has_complete_key(&self) -> bool {
        self.entity
            .primary_key
            .iter()
            .all(|k| matches!(self.values.get(k), Some(v) if !v.is_null()))
    }

    /// JSON object of the stored columns followed by the computed ones
    pub fn to_json(&self) -> Value {
        let mut object: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        for computed in self.entity.computed {
            if let Some(value) = (computed.compute)(self) {
                object.insert(computed.name.to_string(), value);
            }
        }
        Value::Object(object)
    }
}

impl PartialEq for Record {
    /// Compares caller-owned stored columns only: server-managed timestamps and computed
    /// columns never take part in equality.
    fn eq(&self, other: &Self) -> bool {
        if self.entity != other.entity {
            return false;
        }
        self.entity
            .columns
            .iter()
            .filter(|c| !c.is_server_managed())
            .all(|c| {
                let lhs = self.values.get(c.name).unwrap_or(&Value::Null);
                let rhs = other.values.get(c.name).unwrap_or(&Value::Null);
                lhs == rhs
            })
    }
}
