use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::warn;

use super::{Schema, SchemaType};
use crate::MockError;
use crate::config::{DEFAULT_MAX_DEPTH, MockConfig};
use crate::openapi::lookup;
use crate::random::{RandomSource, SeededRandom};

/// Generates example values from schemas.
///
/// Cloning an evolver is cheap, clones share the same random stream.
///
/// # Example
///
/// ```rust
/// use mockspec_core::{Schema, SchemaEvolver};
/// use serde_json::json;
///
/// let evolver = SchemaEvolver::seeded(42);
/// let schema = Schema::from_value(json!({
///     "type": "object",
///     "properties": {
///         "id": { "type": "integer", "format": "int32", "minimum": 1, "maximum": 10 },
///         "name": { "type": "string", "example": "Rex" }
///     }
/// }))?;
///
/// let value = evolver.evolve(&schema)?.expect("an object");
/// assert_eq!(value["name"], "Rex");
/// assert!((1..=10).contains(&value["id"].as_i64().expect("an integer")));
/// # Ok::<(), mockspec_core::MockError>(())
/// ```
#[derive(Clone)]
pub struct SchemaEvolver {
    random: Arc<Mutex<Box<dyn RandomSource>>>,
    max_depth: usize,
    document: Option<Arc<Value>>,
}

impl Debug for SchemaEvolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEvolver")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Default for SchemaEvolver {
    fn default() -> Self {
        Self::new(SeededRandom::from_entropy())
    }
}

impl SchemaEvolver {
    /// Creates an evolver drawing from the given random source.
    pub fn new(random: impl RandomSource + 'static) -> Self {
        Self {
            random: Arc::new(Mutex::new(Box::new(random))),
            max_depth: DEFAULT_MAX_DEPTH,
            document: None,
        }
    }

    /// Creates a deterministic evolver.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(SeededRandom::from_seed(seed))
    }

    /// Creates an evolver following the configuration seed and depth.
    #[must_use]
    pub fn from_config(config: &MockConfig) -> Self {
        Self {
            random: Arc::new(Mutex::new(config.random_source())),
            max_depth: config.max_depth,
            document: None,
        }
    }

    /// Sets the maximum schema nesting.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the document that local `$ref`s left in schemas point into.
    ///
    /// Recursive schemas keep their references after dereferencing, following
    /// them counts as one nesting level.
    #[must_use]
    pub fn with_document(mut self, document: Arc<Value>) -> Self {
        self.document = Some(document);
        self
    }

    /// Generates a value for the schema.
    ///
    /// Returns `None` when the schema does not describe a value that can be
    /// generated, for instance a schema without a type.
    ///
    /// # Errors
    ///
    /// Fails when the schema holds a `$ref` that cannot be followed, when
    /// nesting exceeds the maximum depth, or when a top-level `pattern` is not
    /// a valid regex.
    pub fn evolve(&self, schema: &Schema) -> Result<Option<Value>, MockError> {
        let mut random = self.random.lock().unwrap_or_else(PoisonError::into_inner);
        let mut evolution = Evolution {
            random: &mut **random,
            max_depth: self.max_depth,
            document: self.document.as_deref(),
        };
        evolution.evolve(schema, 0)
    }
}

/// A single generation pass holding the random source.
pub(super) struct Evolution<'a> {
    pub(super) random: &'a mut dyn RandomSource,
    max_depth: usize,
    document: Option<&'a Value>,
}

impl Evolution<'_> {
    pub(super) fn evolve(&mut self, schema: &Schema, depth: usize) -> Result<Option<Value>, MockError> {
        if depth > self.max_depth {
            return Err(MockError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }

        if let Some(example) = &schema.example {
            return Ok(Some(example.clone()));
        }

        if let Some(reference) = &schema.reference {
            let target = self.follow(reference, "schema")?;
            return self.evolve(&target, depth + 1);
        }

        let value = match effective_type(schema) {
            Some(SchemaType::String) => Some(self.evolve_string(schema)?),
            Some(SchemaType::Integer) => Some(self.evolve_integer(schema)),
            Some(SchemaType::Number) => Some(self.evolve_number(schema)),
            Some(SchemaType::Boolean) => Some(Value::Bool(self.random.boolean())),
            Some(SchemaType::Array) => Some(self.evolve_array(schema, depth)?),
            Some(SchemaType::Object) => Some(self.evolve_object(schema, depth)?),
            Some(SchemaType::Null | SchemaType::Other) | None => None,
        };
        Ok(value)
    }

    pub(super) fn follows_references(&self) -> bool {
        self.document.is_some()
    }

    /// The schema targeted by a reference left in the document.
    fn follow(&self, reference: &str, location: &str) -> Result<Schema, MockError> {
        let Some(document) = self.document else {
            return Err(MockError::UnresolvedReference {
                location: location.to_string(),
                reference: reference.to_string(),
            });
        };
        let target = lookup(document, reference)?;
        Schema::from_value(target.clone())
    }

    /// Evolves a child schema, skipping it when its failure is recoverable.
    pub(super) fn evolve_child(
        &mut self,
        schema: &Schema,
        depth: usize,
        location: &str,
    ) -> Result<Option<Value>, MockError> {
        match self.evolve(schema, depth + 1) {
            Ok(value) => Ok(value),
            Err(error) if error.is_generation_precondition() => Err(error),
            Err(error) => {
                warn!(%location, %error, "skipping value that cannot be generated");
                Ok(None)
            }
        }
    }
}

/// The declared type, or the one implied by `properties` and `items`.
fn effective_type(schema: &Schema) -> Option<SchemaType> {
    if schema.has_type() {
        return schema.primary_type();
    }
    if !schema.properties.is_empty() || schema.additional_properties.is_some() {
        return Some(SchemaType::Object);
    }
    schema.items.as_ref().map(|_| SchemaType::Array)
}
