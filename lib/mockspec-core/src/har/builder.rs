use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tracing::debug;
use url::Url;

use super::archive::{Entry, Har, NameValue, Response};
use super::mapper::{matches_query_parameters, replay_delay, to_response};
use crate::handler::{ResolveFuture, ResponseResolver};
use crate::{Handler, MockConfig, MockError, MockRequest};

type MapEntry = dyn Fn(Entry) -> Option<Entry> + Send + Sync;

/// Builds request handlers replaying a recorded HTTP archive.
///
/// Each entry becomes a handler. When the same request was recorded several
/// times, only the most recent entry keeps answering: older entries respond
/// once each, so repeated live requests replay the responses in recording
/// order before settling on the last one.
///
/// # Example
///
/// ```rust
/// use mockspec_core::har::HarHandlerBuilder;
/// use serde_json::json;
///
/// let entry = |body: &str| json!({
///     "request": { "method": "GET", "url": "https://api.example.com/status" },
///     "response": { "status": 200, "content": { "mimeType": "text/plain", "text": body } }
/// });
/// let har = json!({ "log": { "entries": [entry("one"), entry("two")] } });
///
/// let handlers = HarHandlerBuilder::from_value(har)?.build()?;
///
/// assert!(handlers[0].is_once());
/// assert!(!handlers[1].is_once());
/// # Ok::<(), mockspec_core::MockError>(())
/// ```
#[derive(derive_more::Debug)]
pub struct HarHandlerBuilder {
    har: Har,
    config: MockConfig,
    #[debug(skip)]
    map_entry: Option<Box<MapEntry>>,
}

impl HarHandlerBuilder {
    /// Starts from an archive.
    ///
    /// # Errors
    ///
    /// Fails if the archive records no entry.
    pub fn new(har: Har) -> Result<Self, MockError> {
        Ok(Self {
            har: har.validated()?,
            config: MockConfig::default(),
            map_entry: None,
        })
    }

    /// Starts from an archive given as a JSON value.
    ///
    /// # Errors
    ///
    /// Fails if the value is `null`, is not an archive, or records no entry.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MockError> {
        Self::new(Har::from_value(value)?)
    }

    /// Starts from an archive given as JSON text.
    ///
    /// # Errors
    ///
    /// Fails if the text is not an archive or records no entry.
    pub fn from_json(text: &str) -> Result<Self, MockError> {
        Self::new(Har::from_json(text)?)
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Rewrites or drops entries before handlers are created.
    #[must_use]
    pub fn with_map_entry<F>(mut self, map_entry: F) -> Self
    where
        F: Fn(Entry) -> Option<Entry> + Send + Sync + 'static,
    {
        self.map_entry = Some(Box::new(map_entry));
        self
    }

    /// Creates the handlers, in recording order.
    ///
    /// # Errors
    ///
    /// Fails if a kept entry has an invalid method.
    pub fn build(self) -> Result<Vec<Handler>, MockError> {
        let Self { har, config, map_entry } = self;

        let entries = har
            .log
            .entries
            .into_iter()
            .filter_map(|entry| match &map_entry {
                Some(map) => map(entry),
                None => Some(entry),
            })
            .collect::<Vec<_>>();

        let identities = entries
            .iter()
            .map(|entry| format!("{}+{}", entry.request.method, entry.request.url))
            .collect::<Vec<_>>();
        let last_seen = identities
            .iter()
            .enumerate()
            .map(|(index, identity)| (identity.as_str(), index))
            .collect::<HashMap<_, _>>();

        let mut handlers = Vec::with_capacity(entries.len());
        for (index, (entry, identity)) in entries.iter().zip(&identities).enumerate() {
            let once = last_seen
                .get(identity.as_str())
                .is_some_and(|last| *last != index);
            let method = Method::from_bytes(entry.request.method.to_ascii_uppercase().as_bytes())?;
            let url = clean_url(&entry.request.url);
            debug!(%method, %url, once, "replay handler created");

            let resolver = EntryResolver {
                response: entry.response.clone(),
                query: entry.request.query_string.clone(),
                delay: replay_delay(entry.time).filter(|_| config.replay_delay),
            };
            handlers.push(Handler::new(method, url, Arc::new(resolver)).with_once(once));
        }

        Ok(handlers)
    }
}

/// The recorded URL without query string nor fragment.
fn clean_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Replays one recorded response.
struct EntryResolver {
    response: Response,
    query: Vec<NameValue>,
    delay: Option<Duration>,
}

impl ResponseResolver for EntryResolver {
    fn resolve<'a>(&'a self, request: &'a MockRequest) -> ResolveFuture<'a> {
        Box::pin(async move {
            if !matches_query_parameters(&request.query_pairs(), &self.query) {
                return Ok(None);
            }

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            to_response(&self.response).map(Some)
        })
    }
}
