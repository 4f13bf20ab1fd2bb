use bytes::Bytes;
use headers::{ContentType, HeaderMapExt};
use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use http::HeaderMap;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{MediaType, Response};
use crate::config::OverrideParams;
use crate::{MockError, MockRequest, SchemaEvolver};

/// Headers and body generated for a declared response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Negotiated {
    /// Generated headers, including the negotiated `content-type`.
    pub headers: HeaderMap,
    /// Body, absent when no content is declared or accepted.
    pub body: Option<Bytes>,
}

/// Builds the headers and body of a declared response for a request.
#[derive(Debug, Clone, Default)]
pub struct ContentNegotiator {
    evolver: SchemaEvolver,
    overrides: OverrideParams,
}

impl ContentNegotiator {
    /// Creates a negotiator.
    #[must_use]
    pub fn new(evolver: SchemaEvolver, overrides: OverrideParams) -> Self {
        Self { evolver, overrides }
    }

    /// Generates the response headers and body.
    ///
    /// # Errors
    ///
    /// Fails on the generation preconditions: a `$ref` reaching the generator
    /// or a schema nested deeper than the configured limit.
    pub fn negotiate(&self, response: &Response, request: &MockRequest) -> Result<Negotiated, MockError> {
        let mut headers = self.generate_headers(response)?;

        let Some((content_type, media)) = self.select_content(response, request) else {
            return Ok(Negotiated { headers, body: None });
        };
        debug!(%content_type, "content type selected");

        match content_type.parse::<mime::Mime>() {
            Ok(mime) => headers.typed_insert(ContentType::from(mime)),
            Err(error) => match HeaderValue::from_str(content_type) {
                Ok(value) => {
                    debug!(%content_type, %error, "content type sent verbatim");
                    headers.insert(CONTENT_TYPE, value);
                }
                Err(error) => warn!(%content_type, %error, "cannot send content type"),
            },
        }

        let body = self.generate_body(media, request)?.map(to_bytes);
        Ok(Negotiated { headers, body })
    }

    fn select_content<'a>(
        &self,
        response: &'a Response,
        request: &MockRequest,
    ) -> Option<(&'a str, &'a MediaType)> {
        let content = response.content.as_ref()?;

        if let Some(forced) = request.query_value(&self.overrides.content_type) {
            return content
                .get_key_value(forced.as_str())
                .map(|(key, media)| (key.as_str(), media));
        }

        let accepted = accepted_content_types(request.headers());
        if accepted.is_empty() {
            return content.first().map(|(key, media)| (key.as_str(), media));
        }

        accepted.iter().find_map(|pattern| {
            let matcher = accept_matcher(pattern)?;
            content
                .iter()
                .find(|(key, _)| matcher.is_match(key))
                .map(|(key, media)| (key.as_str(), media))
        })
    }

    fn generate_body(&self, media: &MediaType, request: &MockRequest) -> Result<Option<Value>, MockError> {
        if let Some(examples) = media.examples.as_ref().filter(|examples| !examples.is_empty())
            && let Some(name) = request.query_value(&self.overrides.example)
        {
            let value = examples.get(&name).map_or_else(
                || Value::String(format!("Cannot find example by name \"{name}\"")),
                |example| example.value.clone().unwrap_or(Value::Null),
            );
            return Ok(Some(value));
        }

        if let Some(example) = &media.example {
            return Ok(Some(example.clone()));
        }

        if let Some(example) = media
            .examples
            .as_ref()
            .and_then(IndexMap::first)
            .and_then(|(_, example)| example.value.clone())
        {
            return Ok(Some(example));
        }

        let Some(schema) = &media.schema else {
            return Ok(None);
        };
        self.evolver.evolve(schema)
    }

    fn generate_headers(&self, response: &Response) -> Result<HeaderMap, MockError> {
        let mut headers = HeaderMap::new();
        for (name, header) in &response.headers {
            if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            let Some(schema) = header.value_schema() else {
                continue;
            };
            let value = match self.evolver.evolve(&schema) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(error) if error.is_generation_precondition() => return Err(error),
                Err(error) => {
                    warn!(%name, %error, "skipping response header that cannot be generated");
                    continue;
                }
            };

            let text = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            let header_name = match HeaderName::from_bytes(name.as_bytes()) {
                Ok(header_name) => header_name,
                Err(error) => {
                    warn!(%name, %error, "skipping response header");
                    continue;
                }
            };
            match HeaderValue::from_str(&text) {
                Ok(header_value) => {
                    headers.insert(header_name, header_value);
                }
                Err(error) => warn!(%name, %error, "skipping response header value"),
            }
        }
        Ok(headers)
    }
}

/// The media types accepted by a request, in header order.
///
/// Each `Accept` entry loses its parameters (`;q=0.8`), empty entries are
/// dropped.
#[must_use]
pub fn accepted_content_types(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|entry| entry.split(';').next())
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn accept_matcher(pattern: &str) -> Option<Regex> {
    let pattern = regex::escape(pattern).replace(r"\*", ".+?");
    Regex::new(&format!(r"(?i)^{pattern}(\s*;.*)?$")).ok()
}

fn to_bytes(value: Value) -> Bytes {
    match value {
        Value::String(text) => Bytes::from(text),
        other => Bytes::from(other.to_string()),
    }
}
