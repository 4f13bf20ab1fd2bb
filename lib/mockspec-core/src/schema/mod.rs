//! JSON Schema subset used to generate example values.
//!
//! The [`Schema`] model only keeps the keywords that drive generation, every
//! other keyword of an OpenAPI schema object is ignored while deserializing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod composite;
mod evolve;
mod numeric;
mod string;

pub use self::evolve::SchemaEvolver;

/// The primitive type of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `array`
    Array,
    /// `object`
    Object,
    /// `null`
    Null,
    /// Any type name not listed above.
    #[serde(other)]
    Other,
}

/// The `type` keyword, either a single name or a list of names (OpenAPI 3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaTypes {
    /// A single type.
    Single(SchemaType),
    /// A list of types, the first non-null one drives generation.
    Multiple(Vec<SchemaType>),
}

impl SchemaTypes {
    /// The type driving generation.
    #[must_use]
    pub fn primary(&self) -> Option<SchemaType> {
        match self {
            Self::Single(kind) => Some(*kind),
            Self::Multiple(kinds) => kinds
                .iter()
                .find(|kind| **kind != SchemaType::Null)
                .or_else(|| kinds.first())
                .copied(),
        }
    }
}

impl From<SchemaType> for SchemaTypes {
    fn from(value: SchemaType) -> Self {
        Self::Single(value)
    }
}

/// The `additionalProperties` keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// `true` allows random string properties, `false` forbids extras.
    Allowed(bool),
    /// Extra properties follow this schema.
    Schema(Box<Schema>),
}

/// A JSON-Schema-like node.
///
/// # Example
///
/// ```rust
/// use mockspec_core::{Schema, SchemaType};
///
/// let schema: Schema = serde_json::from_str(r#"{
///     "type": "object",
///     "properties": {
///         "id": { "type": "string", "format": "uuid" }
///     }
/// }"#)?;
///
/// assert_eq!(schema.primary_type(), Some(SchemaType::Object));
/// assert!(schema.properties.contains_key("id"));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Reference left by dereferencing, only on recursive schemas.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// The `type` keyword.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaTypes>,

    /// The `format` keyword, compared case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Regular expression generated strings must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Allowed values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Inclusive lower bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Inclusive upper bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Minimum length of strings and arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum length of strings and arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Minimum array size, used when `minLength` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,

    /// Maximum array size, used when `maxLength` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    /// Object properties, in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    /// Array item schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// The `additionalProperties` keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    /// Literal example, returned as-is by the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl Schema {
    /// Creates a schema of the given type.
    #[must_use]
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// Reads a schema from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a schema object.
    pub fn from_value(value: Value) -> Result<Self, crate::MockError> {
        let schema = serde_path_to_error::deserialize(value)?;
        Ok(schema)
    }

    /// The type driving generation.
    #[must_use]
    pub fn primary_type(&self) -> Option<SchemaType> {
        self.schema_type.as_ref().and_then(SchemaTypes::primary)
    }

    /// Sets the `format` keyword.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the `example` keyword.
    #[must_use]
    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    pub(crate) fn has_type(&self) -> bool {
        self.schema_type.is_some()
    }
}
