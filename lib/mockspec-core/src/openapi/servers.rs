use std::sync::LazyLock;

use regex::Regex;

use super::Document;

static PATH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?<name>[^}/]+)}").expect("a valid regex"));

static REPEATED_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/{2,}").expect("a valid regex"));

/// The base URLs handlers are registered under.
///
/// A v2 `host` yields an absolute URL (`https` when the document lists it),
/// otherwise the v2 `basePath` is used, then the v3 `servers` with their
/// variables replaced by default values. Without any of these, handlers are
/// registered relative to the current origin (`/`).
///
/// # Example
///
/// ```rust
/// use mockspec_core::openapi::{Document, server_urls};
/// use serde_json::json;
///
/// let document: Document = serde_json::from_value(json!({
///     "openapi": "3.0.0",
///     "servers": [
///         { "url": "https://{env}.example.com/v1", "variables": { "env": { "default": "api" } } },
///         { "url": "/local" }
///     ]
/// }))?;
///
/// assert_eq!(server_urls(&document), ["https://api.example.com/v1", "/local"]);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[must_use]
pub fn server_urls(document: &Document) -> Vec<String> {
    if let Some(host) = document.host.as_deref().filter(|host| !host.is_empty()) {
        let scheme = if document.schemes.is_empty() || document.schemes.iter().any(|it| it == "https") {
            "https"
        } else {
            document.schemes.first().map_or("https", String::as_str)
        };
        let base_path = document.base_path.as_deref().unwrap_or_default();
        return vec![format!("{scheme}://{host}{base_path}")];
    }

    if let Some(base_path) = &document.base_path {
        return vec![base_path.clone()];
    }

    let urls = document
        .servers
        .iter()
        .map(|server| {
            server
                .variables
                .iter()
                .fold(server.url.clone(), |url, (name, variable)| {
                    url.replace(&format!("{{{name}}}"), &variable.default)
                })
        })
        .collect::<Vec<_>>();

    if urls.is_empty() {
        vec!["/".to_string()]
    } else {
        urls
    }
}

/// Turns `{name}` path template parameters into `:name` parameters.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    PATH_PARAM.replace_all(path, ":$name").into_owned()
}

/// Joins a server URL and a normalized path.
///
/// Relative results always start with a single `/`.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    if joined.contains("://") {
        return joined;
    }

    let collapsed = REPEATED_SLASHES.replace_all(&joined, "/");
    if collapsed.starts_with('/') {
        collapsed.into_owned()
    } else {
        format!("/{collapsed}")
    }
}
