use std::collections::BTreeMap;

use serde_json::Value;
use utoipa::openapi::{schema::Schema, RefOr};

/// Outcome of adding one component schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// Same name, same content. Nothing changed.
    Identical,
    /// Same name, different content. The first schema is kept.
    Conflict,
}

#[derive(Debug, Default, Clone)]
pub struct ComponentsRegistry {
    /// Schema name -> utoipa schema (serialized to components.schemas)
    pub schemas: BTreeMap<String, RefOr<Schema>>,
}

impl ComponentsRegistry {
    /// Register a schema component with conflict detection (compared as JSON).
    pub fn register_schema(&mut self, name: impl Into<String>, schema: RefOr<Schema>) -> Registration {
        let name = name.into();

        let Some(existing) = self.schemas.get(&name) else {
            self.schemas.insert(name, schema);
            return Registration::Inserted;
        };

        if to_json(existing) == to_json(&schema) {
            Registration::Identical
        } else {
            Registration::Conflict
        }
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn to_json(schema: &RefOr<Schema>) -> Value {
    serde_json::to_value(schema).unwrap_or(Value::Null)
}
