/// Errors that can occur while building mock handlers.
///
/// Only hard preconditions surface as a `MockError`. Declarative gaps in a document
/// (no response declared, unknown example name, unmatched query string) are turned
/// into responses by the handlers and never reach this type.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum MockError {
    /// JSON parsing error without location information.
    ///
    /// Occurs when a raw JSON value cannot be read.
    JsonError(serde_json::Error),

    /// JSON deserialization failure with the location of the offending value.
    #[display("Failed to deserialize JSON at '{path}': {error}")]
    #[from(skip)]
    DeserializationError {
        /// The JSON path where the error occurred.
        path: String,
        /// The underlying JSON error.
        error: serde_json::Error,
    },

    /// YAML parsing error.
    #[display("Failed to parse YAML document: {message}")]
    #[from(skip)]
    YamlError {
        /// Description of the YAML failure.
        message: String,
    },

    /// The document does not have the expected shape.
    #[display("Invalid document: {message}")]
    #[from(skip)]
    InvalidDocument {
        /// Why the document was rejected.
        message: String,
    },

    /// A local reference points to a path that does not exist in the document.
    #[display("Cannot resolve reference '{reference}': {message}")]
    #[from(skip)]
    ReferenceNotFound {
        /// The `$ref` value.
        reference: String,
        /// Why resolution failed.
        message: String,
    },

    /// A reference targets another document.
    ///
    /// Only local references (starting with `#`) are supported.
    #[display("Remote reference '{reference}' is not supported")]
    #[from(skip)]
    RemoteReference {
        /// The `$ref` value.
        reference: String,
    },

    /// References lead back to themselves without reaching a value.
    #[display("Circular reference detected at '{reference}'")]
    #[from(skip)]
    CircularReference {
        /// The `$ref` value that closes the cycle.
        reference: String,
    },

    /// A `$ref` reached value generation without a document to resolve it.
    #[display("Failed to generate a value from {location}: found unresolved reference '{reference}'")]
    #[from(skip)]
    UnresolvedReference {
        /// Which part of the schema held the reference.
        location: String,
        /// The `$ref` value.
        reference: String,
    },

    /// Schema nesting is deeper than the configured limit.
    #[display("Schema nesting exceeds the maximum depth of {max_depth}")]
    #[from(skip)]
    DepthExceeded {
        /// The configured limit.
        max_depth: usize,
    },

    /// A string `pattern` is not a usable regular expression.
    #[display("Invalid pattern '{pattern}': {message}")]
    #[from(skip)]
    InvalidPattern {
        /// The pattern from the schema.
        pattern: String,
        /// Why the pattern was rejected.
        message: String,
    },

    /// No archive was given.
    #[display("Failed to generate request handlers from traffic: expected an HAR object but got nothing")]
    MissingArchive,

    /// The archive does not record any exchange.
    #[display("Failed to generate request handlers from traffic: given HAR object has no entries")]
    EmptyArchive,

    /// URL parsing error.
    UrlError(url::ParseError),

    /// Unknown HTTP method.
    InvalidMethod(http::method::InvalidMethod),

    /// Invalid HTTP header name.
    InvalidHeaderName(http::header::InvalidHeaderName),

    /// Invalid HTTP header value.
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// The backing collection rejected an operation.
    #[display("Collection error: {message}")]
    #[from(skip)]
    CollectionError {
        /// Description reported by the collection.
        message: String,
    },
}

impl MockError {
    pub(crate) fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Errors aborting the whole generation instead of a single value.
    pub(crate) fn is_generation_precondition(&self) -> bool {
        matches!(self, Self::UnresolvedReference { .. } | Self::DepthExceeded { .. })
    }
}

impl<E> From<serde_path_to_error::Error<E>> for MockError
where
    E: Into<serde_json::Error>,
{
    fn from(value: serde_path_to_error::Error<E>) -> Self {
        let path = value.path().to_string();
        Self::DeserializationError {
            path,
            error: value.into_inner().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_archive_errors() {
        insta::assert_snapshot!(MockError::EmptyArchive, @"Failed to generate request handlers from traffic: given HAR object has no entries");
    }

    #[test]
    fn should_keep_deserialization_path() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Sample {
            items: Vec<u32>,
        }

        let json = r#"{"items": [1, "two"]}"#;
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let error = serde_path_to_error::deserialize::<_, Sample>(&mut deserializer)
            .map_err(MockError::from)
            .expect_err("should fail on a string item");

        let MockError::DeserializationError { path, .. } = error else {
            panic!("unexpected error {error:?}");
        };
        assert_eq!(path, "items[1]");
    }
}
