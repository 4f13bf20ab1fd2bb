use serde_json::{Map, Value};

use super::evolve::Evolution;
use super::{AdditionalProperties, Schema};
use crate::MockError;

const DEFAULT_MIN_ITEMS: usize = 2;
const EXTRA_ITEMS: usize = 4;
const MAX_ADDITIONAL_PROPERTIES: i64 = 4;
const ADDITIONAL_STRING_LENGTH: usize = 10;

impl Evolution<'_> {
    pub(super) fn evolve_array(&mut self, schema: &Schema, depth: usize) -> Result<Value, MockError> {
        let Some(items) = schema.items.as_deref() else {
            return Ok(Value::Array(vec![]));
        };
        self.ensure_resolved(items, "array items")?;

        let min = schema.min_length.or(schema.min_items);
        let max = schema.max_length.or(schema.max_items);
        let (min, max) = match (min, max) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, min + EXTRA_ITEMS),
            (None, Some(max)) => (DEFAULT_MIN_ITEMS.min(max), max),
            (None, None) => (DEFAULT_MIN_ITEMS, DEFAULT_MIN_ITEMS + EXTRA_ITEMS),
        };

        let length = self.random.uniform_int(to_i64(min), to_i64(max));
        let mut values = Vec::new();
        for _ in 0..length {
            if let Some(value) = self.evolve_child(items, depth, "array item")? {
                values.push(value);
            }
        }
        Ok(Value::Array(values))
    }

    pub(super) fn evolve_object(&mut self, schema: &Schema, depth: usize) -> Result<Value, MockError> {
        let mut object = Map::new();

        for (name, property) in &schema.properties {
            self.ensure_resolved(property, &format!("property '{name}'"))?;
            if let Some(value) = self.evolve_child(property, depth, name)? {
                object.insert(name.clone(), value);
            }
        }

        match &schema.additional_properties {
            Some(AdditionalProperties::Allowed(true)) => {
                let count = self.random.uniform_int(0, MAX_ADDITIONAL_PROPERTIES);
                for _ in 0..count {
                    let name = self.random.word();
                    let value = Value::String(self.random.token(ADDITIONAL_STRING_LENGTH));
                    object.entry(name).or_insert(value);
                }
            }
            Some(AdditionalProperties::Schema(extra)) => {
                self.ensure_resolved(extra, "additionalProperties")?;
                let count = self.random.uniform_int(0, MAX_ADDITIONAL_PROPERTIES);
                for _ in 0..count {
                    let name = self.random.word();
                    if object.contains_key(&name) {
                        continue;
                    }
                    if let Some(value) = self.evolve_child(extra, depth, &name)? {
                        object.insert(name, value);
                    }
                }
            }
            Some(AdditionalProperties::Allowed(false)) | None => {}
        }

        Ok(Value::Object(object))
    }

    /// Fails on a `$ref` that is not shadowed by an `example` and cannot be
    /// followed.
    fn ensure_resolved(&self, schema: &Schema, location: &str) -> Result<(), MockError> {
        match &schema.reference {
            Some(reference) if schema.example.is_none() && !self.follows_references() => {
                Err(MockError::UnresolvedReference {
                    location: location.to_string(),
                    reference: reference.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
