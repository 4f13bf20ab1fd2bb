//! Conventional REST handlers over a record store.
//!
//! [`CollectionHandlerBuilder`] exposes a [`Collection`] of JSON records
//! under `/{name}` with the usual list, find, create, update and delete
//! routes.

use std::sync::{Arc, Mutex, PoisonError};

use http::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::handler::{ResolveFuture, ResponseResolver};
use crate::{Handler, MockError, MockRequest, MockResponse};

/// Predicate selecting records.
pub type RecordFilter<'a> = &'a (dyn Fn(&Value) -> bool + Send + Sync);

/// A store of JSON records.
pub trait Collection: Send + Sync {
    /// Every record, in insertion order.
    fn all(&self) -> Vec<Value>;

    /// The first record matching the predicate.
    fn find_first(&self, filter: RecordFilter<'_>) -> Option<Value>;

    /// Stores a new record and returns it as stored.
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the record.
    fn create(&self, record: Value) -> Result<Value, MockError>;

    /// Merges the patch into the first record matching the predicate and
    /// returns the updated record.
    fn update(&self, filter: RecordFilter<'_>, patch: Value) -> Option<Value>;

    /// Removes the first record matching the predicate and returns it.
    fn delete(&self, filter: RecordFilter<'_>) -> Option<Value>;
}

/// A [`Collection`] kept in memory.
///
/// # Example
///
/// ```rust
/// use mockspec_core::collection::{Collection, InMemoryCollection};
/// use serde_json::json;
///
/// let users = InMemoryCollection::from_records([json!({ "id": 1, "name": "Ada" })]);
/// users.update(&|user| user["id"] == 1, json!({ "name": "Grace" }));
///
/// assert_eq!(users.all(), [json!({ "id": 1, "name": "Grace" })]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCollection {
    records: Mutex<Vec<Value>>,
}

impl InMemoryCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding the given records.
    pub fn from_records(records: impl IntoIterator<Item = Value>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().collect()),
        }
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Collection for InMemoryCollection {
    fn all(&self) -> Vec<Value> {
        self.records().clone()
    }

    fn find_first(&self, filter: RecordFilter<'_>) -> Option<Value> {
        self.records().iter().find(|record| filter(record)).cloned()
    }

    fn create(&self, record: Value) -> Result<Value, MockError> {
        if !record.is_object() {
            return Err(MockError::CollectionError {
                message: format!("expected a JSON object, got {record}"),
            });
        }
        self.records().push(record.clone());
        Ok(record)
    }

    fn update(&self, filter: RecordFilter<'_>, patch: Value) -> Option<Value> {
        let mut records = self.records();
        let record = records.iter_mut().find(|record| filter(record))?;
        merge(record, patch);
        Some(record.clone())
    }

    fn delete(&self, filter: RecordFilter<'_>) -> Option<Value> {
        let mut records = self.records();
        let index = records.iter().position(|record| filter(record))?;
        Some(records.remove(index))
    }
}

/// Deep-merges `patch` into `target`, objects are merged key by key and any
/// other value replaces the target.
fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Builds the REST handlers of a collection.
///
/// | Route                 | Success           | Miss |
/// |-----------------------|-------------------|------|
/// | `GET /{name}`         | 200, every record |      |
/// | `GET /{name}/:key`    | 200, the record   | 404  |
/// | `POST /{name}`        | 201, the record   |      |
/// | `PUT /{name}/:key`    | 200, merged       | 404  |
/// | `DELETE /{name}/:key` | 200, deleted      | 404  |
#[derive(derive_more::Debug)]
pub struct CollectionHandlerBuilder {
    name: String,
    key: String,
    base_url: String,
    #[debug(skip)]
    collection: Arc<dyn Collection>,
}

impl CollectionHandlerBuilder {
    /// Creates a builder for the collection exposed under `/{name}`, records
    /// being identified by the `key` property (a dotted path is allowed).
    pub fn new(name: impl Into<String>, key: impl Into<String>, collection: Arc<dyn Collection>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            base_url: String::new(),
            collection,
        }
    }

    /// Prefixes every route, trailing slashes are ignored.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Creates the five handlers.
    #[must_use]
    pub fn build(self) -> Vec<Handler> {
        let Self {
            name,
            key,
            base_url,
            collection,
        } = self;

        let list_url = format!("{base_url}/{name}");
        let record_url = format!("{list_url}/:{key}");
        let routes = [
            (Method::GET, &list_url, Route::List),
            (Method::GET, &record_url, Route::Find),
            (Method::POST, &list_url, Route::Create),
            (Method::PUT, &record_url, Route::Update),
            (Method::DELETE, &record_url, Route::Delete),
        ];

        routes
            .into_iter()
            .map(|(method, url, route)| {
                debug!(%method, %url, ?route, "collection handler created");
                let resolver = RouteResolver {
                    route,
                    key: key.clone(),
                    collection: Arc::clone(&collection),
                };
                Handler::new(method, url.clone(), Arc::new(resolver))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Route {
    List,
    Find,
    Create,
    Update,
    Delete,
}

struct RouteResolver {
    route: Route,
    key: String,
    collection: Arc<dyn Collection>,
}

impl RouteResolver {
    fn respond(&self, request: &MockRequest) -> Result<MockResponse, MockError> {
        match self.route {
            Route::List => MockResponse::from_json(StatusCode::OK, &self.collection.all()),
            Route::Create => {
                let Ok(input) = serde_json::from_slice::<Value>(request.body()) else {
                    return Ok(MockResponse::new(StatusCode::BAD_REQUEST));
                };
                let record = self.collection.create(input)?;
                MockResponse::from_json(StatusCode::CREATED, &record)
            }
            Route::Find => {
                let expected = self.key_param(request);
                let record = self.collection.find_first(&|record| self.matches(record, &expected));
                found(record)
            }
            Route::Update => {
                let Ok(patch) = serde_json::from_slice::<Value>(request.body()) else {
                    return Ok(MockResponse::new(StatusCode::BAD_REQUEST));
                };
                let expected = self.key_param(request);
                let record = self
                    .collection
                    .update(&|record| self.matches(record, &expected), patch);
                found(record)
            }
            Route::Delete => {
                let expected = self.key_param(request);
                let record = self.collection.delete(&|record| self.matches(record, &expected));
                found(record)
            }
        }
    }

    /// The key value of the request, from the path parameter or the last
    /// path segment.
    fn key_param(&self, request: &MockRequest) -> String {
        if let Some(value) = request.param(&self.key) {
            return value.to_string();
        }
        request
            .url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|segment| {
                percent_encoding::percent_decode_str(segment)
                    .decode_utf8_lossy()
                    .into_owned()
            })
            .unwrap_or_default()
    }

    fn matches(&self, record: &Value, expected: &str) -> bool {
        let value = self
            .key
            .split('.')
            .try_fold(record, |value, segment| value.get(segment));
        match value {
            Some(Value::String(text)) => text == expected,
            Some(Value::Number(number)) => number.to_string() == expected,
            Some(Value::Bool(flag)) => flag.to_string() == expected,
            _ => false,
        }
    }
}

fn found(record: Option<Value>) -> Result<MockResponse, MockError> {
    match record {
        Some(record) => MockResponse::from_json(StatusCode::OK, &record),
        None => Ok(MockResponse::new(StatusCode::NOT_FOUND)),
    }
}

impl ResponseResolver for RouteResolver {
    fn resolve<'a>(&'a self, request: &'a MockRequest) -> ResolveFuture<'a> {
        Box::pin(async move { self.respond(request).map(Some) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_merge_nested_objects() {
        let mut record = json!({"id": 1, "profile": {"name": "Ada", "age": 36}, "tags": ["a"]});

        merge(&mut record, json!({"profile": {"age": 37}, "tags": ["b"], "active": true}));

        insta::assert_snapshot!(record, @r#"{"id":1,"profile":{"name":"Ada","age":37},"tags":["b"],"active":true}"#);
    }

    #[test]
    fn should_delete_first_match_only() {
        let collection = InMemoryCollection::from_records([json!({"n": 1}), json!({"n": 1}), json!({"n": 2})]);

        let deleted = collection.delete(&|record| record["n"] == 1);

        assert_eq!(deleted, Some(json!({"n": 1})));
        assert_eq!(collection.all().len(), 2);
    }

    #[test]
    fn should_reject_non_object_records() {
        let error = InMemoryCollection::new()
            .create(json!([1, 2]))
            .expect_err("should reject");

        insta::assert_snapshot!(error, @"Collection error: expected a JSON object, got [1,2]");
    }

    #[test]
    fn should_build_routes() {
        let collection = Arc::new(InMemoryCollection::new());

        let handlers = CollectionHandlerBuilder::new("users", "id", collection)
            .with_base_url("https://api.example.com//")
            .build();

        let rules = handlers.iter().map(ToString::to_string).collect::<Vec<_>>();
        insta::assert_debug_snapshot!(rules, @r#"
        [
            "GET https://api.example.com/users",
            "GET https://api.example.com/users/:id",
            "POST https://api.example.com/users",
            "PUT https://api.example.com/users/:id",
            "DELETE https://api.example.com/users/:id",
        ]
        "#);
    }

    #[test]
    fn should_compare_keys_loosely() {
        let resolver = RouteResolver {
            route: Route::Find,
            key: "profile.id".to_string(),
            collection: Arc::new(InMemoryCollection::new()),
        };

        assert!(resolver.matches(&json!({"profile": {"id": 7}}), "7"));
        assert!(resolver.matches(&json!({"profile": {"id": "7"}}), "7"));
        assert!(resolver.matches(&json!({"profile": {"id": true}}), "true"));
        assert!(!resolver.matches(&json!({"profile": {}}), "7"));
        assert!(!resolver.matches(&json!({"id": 7}), "7"));
    }
}
