//! Handlers replaying HTTP archives (HAR 1.2).
//!
//! Every recorded entry becomes a handler answering with the recorded
//! response, after the recorded time when replay delays are enabled. An entry
//! recorded with a query string only answers requests carrying exactly the
//! same parameters, others are left unhandled.

mod archive;
mod builder;
mod mapper;

pub use self::archive::{Content, Entry, Har, Log, NameValue, Request, Response};
pub use self::builder::HarHandlerBuilder;
pub use self::mapper::{decode_body, matches_query_parameters, replay_delay, to_response};
