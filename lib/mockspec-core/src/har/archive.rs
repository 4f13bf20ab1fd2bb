use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::MockError;

/// An HTTP Archive (HAR 1.2) document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Har {
    /// The archive root.
    pub log: Log,
}

impl Har {
    /// Reads an archive from JSON text.
    ///
    /// # Errors
    ///
    /// Fails if the text is not an archive, if it is `null`, or if it records
    /// no entry.
    pub fn from_json(text: &str) -> Result<Self, MockError> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let value: Value = serde_path_to_error::deserialize(&mut deserializer)?;
        Self::from_value(value)
    }

    /// Reads an archive from a JSON value.
    ///
    /// # Errors
    ///
    /// Fails if the value is not an archive, if it is `null`, or if it
    /// records no entry.
    pub fn from_value(value: Value) -> Result<Self, MockError> {
        if value.is_null() {
            return Err(MockError::MissingArchive);
        }
        let har: Self = serde_path_to_error::deserialize(value)?;
        har.validated()
    }

    pub(super) fn validated(self) -> Result<Self, MockError> {
        if self.log.entries.is_empty() {
            return Err(MockError::EmptyArchive);
        }
        Ok(self)
    }
}

/// The `log` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Recorded exchanges, in chronological order.
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// One recorded exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// When the request started, ISO 8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_date_time: Option<String>,

    /// Total elapsed time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,

    /// The recorded request.
    pub request: Request,

    /// The recorded response.
    pub response: Response,
}

/// A recorded request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request method.
    pub method: String,

    /// Absolute URL, including the query string.
    pub url: String,

    /// HTTP version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_version: Option<String>,

    /// Request headers.
    #[serde(default)]
    pub headers: Vec<NameValue>,

    /// Query parameters, as recorded (possibly still URL-encoded).
    #[serde(default)]
    pub query_string: Vec<NameValue>,
}

/// A recorded response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Status code.
    pub status: u16,

    /// Reason phrase.
    #[serde(default)]
    pub status_text: String,

    /// Response headers.
    #[serde(default)]
    pub headers: Vec<NameValue>,

    /// Response body.
    #[serde(default)]
    pub content: Content,
}

/// A recorded response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Body size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,

    /// Body media type.
    #[serde(default)]
    pub mime_type: String,

    /// Body text, encoded when `encoding` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Encoding of `text`, usually `base64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// A header or a query parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    /// Name.
    pub name: String,
    /// Value.
    pub value: String,
}

impl NameValue {
    /// Creates a pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
