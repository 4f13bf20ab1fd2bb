use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use super::negotiate::ContentNegotiator;
use super::select::{Selection, select_response};
use super::servers::{join_url, normalize_path, server_urls};
use super::{Document, Operation, Response};
use crate::config::OverrideParams;
use crate::handler::{ResolveFuture, ResponseResolver};
use crate::{Handler, MockConfig, MockError, MockRequest, MockResponse, SchemaEvolver};

const METHODS: [Method; 8] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::OPTIONS,
    Method::HEAD,
    Method::PATCH,
    Method::TRACE,
];

const PATH_ITEM_FIELDS: [&str; 5] = ["$ref", "summary", "description", "servers", "parameters"];

type MapOperation = dyn Fn(&str, &Method, Operation) -> Option<Operation> + Send + Sync;

/// Builds request handlers from an OpenAPI v2 or v3 document.
///
/// One handler is created per operation and per server URL.
///
/// # Example
///
/// ```rust
/// use mockspec_core::openapi::OpenApiHandlerBuilder;
///
/// let handlers = OpenApiHandlerBuilder::from_json(r#"{
///     "openapi": "3.0.0",
///     "paths": {
///         "/pet/{petId}": {
///             "get": { "responses": { "200": { "description": "A pet" } } },
///             "delete": { "responses": { "204": { "description": "Deleted" } } }
///         }
///     }
/// }"#)?
/// .build()?;
///
/// let rules = handlers.iter().map(ToString::to_string).collect::<Vec<_>>();
/// assert_eq!(rules, ["GET /pet/:petId", "DELETE /pet/:petId"]);
/// # Ok::<(), mockspec_core::MockError>(())
/// ```
#[derive(derive_more::Debug)]
pub struct OpenApiHandlerBuilder {
    document: Value,
    config: MockConfig,
    evolver: Option<SchemaEvolver>,
    #[debug(skip)]
    map_operation: Option<Box<MapOperation>>,
}

impl OpenApiHandlerBuilder {
    /// Starts from an already parsed document.
    #[must_use]
    pub fn from_value(document: Value) -> Self {
        Self {
            document,
            config: MockConfig::default(),
            evolver: None,
            map_operation: None,
        }
    }

    /// Starts from a JSON document.
    ///
    /// # Errors
    ///
    /// Fails if the text is not valid JSON.
    pub fn from_json(text: &str) -> Result<Self, MockError> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let document = serde_path_to_error::deserialize(&mut deserializer)?;
        Ok(Self::from_value(document))
    }

    /// Starts from a YAML document.
    ///
    /// # Errors
    ///
    /// Fails if the text is not valid YAML.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(text: &str) -> Result<Self, MockError> {
        let document = serde_saphyr::from_str(text).map_err(|err| MockError::YamlError {
            message: err.to_string(),
        })?;
        Ok(Self::from_value(document))
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses the given evolver instead of one created from the configuration.
    #[must_use]
    pub fn with_evolver(mut self, evolver: SchemaEvolver) -> Self {
        self.evolver = Some(evolver);
        self
    }

    /// Rewrites or drops operations before handlers are created.
    ///
    /// The closure receives the path template, the method and the operation.
    /// Returning `None` drops the operation.
    #[must_use]
    pub fn with_map_operation<F>(mut self, map_operation: F) -> Self
    where
        F: Fn(&str, &Method, Operation) -> Option<Operation> + Send + Sync + 'static,
    {
        self.map_operation = Some(Box::new(map_operation));
        self
    }

    /// Creates the handlers.
    ///
    /// # Errors
    ///
    /// Fails if a reference cannot be resolved or if an operation is not a
    /// valid operation object. Recursive schemas are not an error here, their
    /// generation is bounded by the configured maximum depth.
    pub fn build(self) -> Result<Vec<Handler>, MockError> {
        let Self {
            document,
            config,
            evolver,
            map_operation,
        } = self;

        if !document.is_object() {
            return Err(MockError::invalid_document("an OpenAPI document must be an object"));
        }
        let resolved = Arc::new(super::dereference(document)?);
        let document: Document = serde_path_to_error::deserialize(resolved.as_ref())?;

        let servers = server_urls(&document);
        let evolver = evolver
            .unwrap_or_else(|| SchemaEvolver::from_config(&config))
            .with_document(resolved);
        let negotiator = ContentNegotiator::new(evolver, config.overrides.clone());

        let mut handlers = Vec::new();
        for (path, item) in document.paths.iter().flatten() {
            let pattern = normalize_path(path);
            for (key, operation) in item {
                let Some(method) = operation_method(key) else {
                    if !is_path_item_field(key) {
                        warn!(%path, %key, "skipping unsupported operation key");
                    }
                    continue;
                };
                if operation.is_null() {
                    continue;
                }

                let operation: Operation = serde_json::from_value(operation.clone()).map_err(|error| {
                    MockError::invalid_document(format!("operation {method} {path}: {error}"))
                })?;
                let operation = match &map_operation {
                    Some(map) => map(path, &method, operation),
                    None => Some(operation),
                };
                let Some(operation) = operation else {
                    debug!(%method, %path, "operation dropped");
                    continue;
                };

                let produces = operation.produces.as_deref().unwrap_or(document.produces.as_slice());
                let responses = operation.responses.as_ref().map(|responses| {
                    responses
                        .iter()
                        .map(|(status, response)| (status.clone(), response.clone().normalized(produces)))
                        .collect::<IndexMap<_, _>>()
                });

                let resolver: Arc<dyn ResponseResolver> = Arc::new(OperationResolver {
                    responses,
                    negotiator: negotiator.clone(),
                    overrides: config.overrides.clone(),
                });
                for server in &servers {
                    let url = join_url(server, &pattern);
                    debug!(%method, %url, operation_id = ?operation.operation_id, "handler created");
                    handlers.push(Handler::new(method.clone(), url, Arc::clone(&resolver)));
                }
            }
        }

        Ok(handlers)
    }
}

impl FromStr for OpenApiHandlerBuilder {
    type Err = MockError;

    /// Reads a JSON document when the text starts with `{`, a YAML one otherwise.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.trim_start().starts_with('{') {
            return Self::from_json(text);
        }

        #[cfg(feature = "yaml")]
        {
            Self::from_yaml(text)
        }
        #[cfg(not(feature = "yaml"))]
        {
            Err(MockError::YamlError {
                message: "YAML support requires the `yaml` feature".to_string(),
            })
        }
    }
}

fn operation_method(key: &str) -> Option<Method> {
    METHODS
        .iter()
        .find(|method| method.as_str().eq_ignore_ascii_case(key))
        .cloned()
}

fn is_path_item_field(key: &str) -> bool {
    key.starts_with("x-") || PATH_ITEM_FIELDS.contains(&key)
}

/// Answers requests for one operation.
struct OperationResolver {
    responses: Option<IndexMap<String, Response>>,
    negotiator: ContentNegotiator,
    overrides: OverrideParams,
}

impl OperationResolver {
    fn respond(&self, request: &MockRequest) -> Result<MockResponse, MockError> {
        match select_response(self.responses.as_ref(), request, &self.overrides) {
            Selection::NotImplemented => {
                debug!(url = %request.url(), "no suitable response declared");
                Ok(MockResponse::not_implemented())
            }
            Selection::Response { status, response } => {
                debug!(?status, url = %request.url(), "response selected");
                let negotiated = self.negotiator.negotiate(response, request)?;
                Ok(MockResponse::new(status)
                    .with_headers(negotiated.headers)
                    .with_optional_body(negotiated.body))
            }
        }
    }
}

impl ResponseResolver for OperationResolver {
    fn resolve<'a>(&'a self, request: &'a MockRequest) -> ResolveFuture<'a> {
        Box::pin(async move { self.respond(request).map(Some) })
    }
}
