//! # Mockspec Core
//!
//! Generate HTTP mock handlers from API descriptions.
//!
//! This crate turns three kinds of sources into [`Handler`]s, rules made of a
//! method, a URL pattern and a resolver producing a [`MockResponse`]:
//! - **[`openapi`]** - an OpenAPI v2 or v3 document, with bodies taken from
//!   declared examples or generated from schemas
//! - **[`har`]** - a recorded HTTP archive, replayed in recording order
//! - **[`collection`]** - a record store exposed as REST routes
//!
//! Matching live requests against URL patterns is left to the interception
//! layer, which calls [`Handler::resolve`] with the path parameters it
//! extracted.
//!
//! ## Quick Start
//!
//! ```rust
//! use mockspec_core::{MockConfig, MockRequest};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), mockspec_core::MockError> {
//! let document = r#"{
//!     "openapi": "3.0.0",
//!     "paths": {
//!         "/user/{userId}": {
//!             "get": {
//!                 "responses": {
//!                     "200": {
//!                         "description": "A user",
//!                         "content": { "application/json": { "example": { "id": "abc-123" } } }
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! }"#;
//!
//! let handlers = mockspec_core::from_open_api(document, MockConfig::default().with_seed(1))?;
//! assert_eq!(handlers[0].url(), "/user/:userId");
//!
//! let request = MockRequest::parse("GET", "http://localhost/user/42")?.with_param("userId", "42");
//! let response = handlers[0].resolve(&request).await?.expect("a response");
//!
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.header("content-type"), Some("application/json"));
//! assert_eq!(response.text().as_deref(), Some(r#"{"id":"abc-123"}"#));
//! # Ok(())
//! # }
//! ```
//!
//! ## Generated values
//!
//! Values generated from schemas go through a [`SchemaEvolver`]. An explicit
//! `example` always wins over generation. Set [`MockConfig::seed`] to get the
//! same values on every run.
//!
//! ## Reserved query parameters
//!
//! OpenAPI handlers understand `?response=<status>`, `?example=<name>` and
//! `?type=<media type>`, see [`OverrideParams`] to rename them.
//!
//! ## Error Handling
//!
//! Builders fail with a [`MockError`] on hard preconditions only. A missing
//! declared response becomes a `501 Not Implemented` response, an unknown
//! example name becomes a diagnostic body, and a HAR entry whose query string
//! does not match simply leaves the request unhandled.

use std::sync::Arc;

mod config;
mod cookie;
mod error;
mod handler;
mod random;
mod schema;

pub mod collection;
pub mod har;
pub mod openapi;

pub use self::config::{DEFAULT_MAX_DEPTH, MockConfig, OverrideParams};
pub use self::cookie::ResponseCookie;
pub use self::error::MockError;
pub use self::handler::{
    Handler, MockRequest, MockResponse, NOT_IMPLEMENTED, ResolveFuture, ResponseResolver,
};
pub use self::random::{RandomSource, SeededRandom};
pub use self::schema::{AdditionalProperties, Schema, SchemaEvolver, SchemaType, SchemaTypes};

/// Creates handlers from an OpenAPI document given as JSON or YAML text.
///
/// # Errors
///
/// Fails if the document cannot be read or dereferenced.
pub fn from_open_api(document: &str, config: MockConfig) -> Result<Vec<Handler>, MockError> {
    document
        .parse::<openapi::OpenApiHandlerBuilder>()?
        .with_config(config)
        .build()
}

/// Creates handlers replaying an HTTP archive given as a JSON value.
///
/// # Errors
///
/// Fails if the archive is `null`, malformed, or has no entry.
pub fn from_traffic(har: serde_json::Value, config: MockConfig) -> Result<Vec<Handler>, MockError> {
    har::HarHandlerBuilder::from_value(har)?
        .with_config(config)
        .build()
}

/// Creates the REST handlers of a collection.
pub fn from_collection(
    name: &str,
    key: &str,
    collection: Arc<dyn collection::Collection>,
    base_url: Option<&str>,
) -> Vec<Handler> {
    let builder = collection::CollectionHandlerBuilder::new(name, key, collection);
    match base_url {
        Some(base_url) => builder.with_base_url(base_url),
        None => builder,
    }
    .build()
}
