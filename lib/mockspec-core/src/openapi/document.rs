use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Schema;

/// Media type used by OpenAPI v2 responses without `produces`.
pub(super) const DEFAULT_PRODUCES: &str = "application/json";

/// The parts of an OpenAPI v2 or v3 document used to build handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Version marker of OpenAPI v2 documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,

    /// Version marker of OpenAPI v3 documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,

    /// v2 host, with an optional port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// v2 base path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// v2 transfer protocols.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,

    /// v3 servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,

    /// v2 default response media types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,

    /// Path items keyed by path template, each holding operations keyed by method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<IndexMap<String, IndexMap<String, Value>>>,
}

/// A v3 server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// URL template, `{name}` placeholders refer to `variables`.
    pub url: String,

    /// Substitution values of the URL template.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, ServerVariable>,
}

/// A v3 server variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    /// Value used when building URLs.
    pub default: String,
}

/// One operation of a path item.
///
/// This is the value handed to the map-operation callback of
/// [`OpenApiHandlerBuilder`](super::OpenApiHandlerBuilder), so it can be
/// altered before a handler is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    /// v2 response media types, overriding the document ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produces: Option<Vec<String>>,

    /// Responses keyed by status code, status range (`2XX`) or `default`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<IndexMap<String, Response>>,
}

/// A declared response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Response headers.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Header>,

    /// Bodies keyed by media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,

    /// v2 body schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// v2 examples keyed by media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<IndexMap<String, Value>>,
}

impl Response {
    /// Moves a v2 `schema` and `examples` into `content`.
    ///
    /// One media type is created per `produces` entry. v3 responses are
    /// returned unchanged.
    #[must_use]
    pub fn normalized(mut self, produces: &[String]) -> Self {
        if self.content.is_some() || (self.schema.is_none() && self.examples.is_none()) {
            return self;
        }

        let schema = self.schema.take();
        let examples = self.examples.take().unwrap_or_default();
        let default_produces = [DEFAULT_PRODUCES.to_string()];
        let produces = if produces.is_empty() {
            &default_produces[..]
        } else {
            produces
        };

        let content = produces
            .iter()
            .map(|mime| {
                let media = MediaType {
                    example: examples.get(mime).cloned(),
                    examples: None,
                    schema: schema.clone(),
                };
                (mime.clone(), media)
            })
            .collect();
        self.content = Some(content);
        self
    }
}

/// A declared response header.
///
/// v3 headers carry a `schema`, v2 headers are themselves a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// v3 header schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// Literal header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    /// v2 inline schema.
    #[serde(flatten)]
    pub inline: Schema,
}

impl Header {
    /// The schema describing the header value, if any.
    #[must_use]
    pub fn value_schema(&self) -> Option<Schema> {
        let schema = self
            .schema
            .clone()
            .or_else(|| self.inline.has_type().then(|| self.inline.clone()));

        match (schema, &self.example) {
            (Some(schema), Some(example)) => Some(schema.with_example(example.clone())),
            (None, Some(example)) => Some(Schema::default().with_example(example.clone())),
            (schema, None) => schema,
        }
    }
}

/// A body description for one media type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Literal body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    /// Named literal bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<IndexMap<String, Example>>,

    /// Body schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// A named example.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// The example value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}
