#![allow(dead_code)]

use indexmap::IndexMap;
use mockspec_core::openapi::OpenApiHandlerBuilder;
use mockspec_core::{Handler, MockConfig, MockRequest, MockResponse};
use rstest::fixture;
use tracing::info;

pub const PETSTORE: &str = include_str!("../fixtures/petstore.yaml");

pub const PETSTORE_URL: &str = "https://petstore.example.com/v1";

/// Installs a tracing subscriber writing to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

#[fixture]
pub fn petstore() -> Interceptor {
    init_tracing();
    let handlers = OpenApiHandlerBuilder::from_yaml(PETSTORE)
        .and_then(|builder| builder.with_config(MockConfig::default().with_seed(42)).build());
    match handlers {
        Ok(handlers) => Interceptor::new(handlers),
        Err(error) => panic!("fail to build petstore handlers: {error}"),
    }
}

/// A minimal interception layer: the first handler matching the method and
/// the URL pattern that responds wins.
#[derive(Debug)]
pub struct Interceptor {
    handlers: Vec<Handler>,
}

impl Interceptor {
    pub fn new(handlers: Vec<Handler>) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub async fn send(&self, method: &str, url: &str) -> anyhow::Result<Option<MockResponse>> {
        let request = MockRequest::parse(method, url)?;
        self.handle(request).await
    }

    pub async fn handle(&self, request: MockRequest) -> anyhow::Result<Option<MockResponse>> {
        for handler in &self.handlers {
            if handler.method() != request.method() || handler.is_used() {
                continue;
            }
            let Some(params) = match_pattern(handler.url(), &request) else {
                continue;
            };

            let request = params
                .into_iter()
                .fold(request.clone(), |request, (name, value)| request.with_param(name, value));
            if let Some(response) = handler.resolve(&request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

/// Matches a `:param` URL pattern, absolute or relative, against a request.
pub fn match_pattern(pattern: &str, request: &MockRequest) -> Option<IndexMap<String, String>> {
    let url = request.url();
    let target = if pattern.contains("://") {
        format!("{}{}", url.origin().ascii_serialization(), url.path())
    } else {
        url.path().to_string()
    };

    let expected = pattern.trim_end_matches('/').split('/').collect::<Vec<_>>();
    let actual = target.trim_end_matches('/').split('/').collect::<Vec<_>>();
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = IndexMap::new();
    for (expected, actual) in expected.iter().zip(&actual) {
        match expected.strip_prefix(':') {
            Some(name) if !actual.is_empty() => {
                params.insert(name.to_string(), (*actual).to_string());
            }
            Some(_) => return None,
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}
