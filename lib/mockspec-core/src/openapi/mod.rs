//! Handlers generated from OpenAPI v2 and v3 documents.
//!
//! The document is dereferenced, each operation becomes a handler per server
//! URL, and each handler answers with the selected declared response whose
//! body is either a declared example or a value generated from its schema.
//!
//! Requests may force parts of the response with reserved query parameters,
//! see [`OverrideParams`](crate::OverrideParams).

mod builder;
mod dereference;
mod document;
mod negotiate;
mod select;
mod servers;

pub use self::builder::OpenApiHandlerBuilder;
pub use self::dereference::dereference;
pub(crate) use self::dereference::lookup;
pub use self::document::{Document, Example, Header, MediaType, Operation, Response, Server, ServerVariable};
pub use self::negotiate::{ContentNegotiator, Negotiated, accepted_content_types};
pub use self::select::{Selection, select_response};
pub use self::servers::{join_url, normalize_path, server_urls};
