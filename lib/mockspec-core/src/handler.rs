use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use headers::{ContentType, HeaderMapExt};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{MockError, ResponseCookie};

/// Body of the 501 response.
pub const NOT_IMPLEMENTED: &str = "Not Implemented";

/// The future returned by a [`ResponseResolver`].
pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<MockResponse>, MockError>> + Send + 'a>>;

/// Produces the response of a handler for an intercepted request.
///
/// Returning `Ok(None)` declines the request, the interception layer then
/// applies its own policy for unhandled requests.
pub trait ResponseResolver: Send + Sync {
    /// Resolves the request.
    fn resolve<'a>(&'a self, request: &'a MockRequest) -> ResolveFuture<'a>;
}

/// A mock rule: requests with this method matching this URL pattern are
/// answered by the resolver.
///
/// URL patterns use colon path parameters (`/pet/:petId`) and are either
/// absolute (`https://api.example.com/pet/:petId`) or relative to the current
/// origin. Matching requests against patterns is the job of the interception
/// layer.
#[derive(derive_more::Debug, derive_more::Display)]
#[display("{method} {url}")]
pub struct Handler {
    method: Method,
    url: String,
    once: bool,
    used: AtomicBool,
    #[debug(skip)]
    resolver: Arc<dyn ResponseResolver>,
}

impl Handler {
    /// Creates a standing handler.
    pub fn new(method: Method, url: impl Into<String>, resolver: Arc<dyn ResponseResolver>) -> Self {
        Self {
            method,
            url: url.into(),
            once: false,
            used: AtomicBool::new(false),
            resolver,
        }
    }

    /// Makes the handler respond at most once.
    #[must_use]
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URL pattern.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the handler responds at most once.
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Whether a one-shot handler has already responded.
    pub fn is_used(&self) -> bool {
        self.once && self.used.load(Ordering::Acquire)
    }

    /// Makes a used one-shot handler respond again.
    pub fn reset(&self) {
        self.used.store(false, Ordering::Release);
    }

    /// Resolves an intercepted request.
    ///
    /// A used one-shot handler returns `Ok(None)`. A one-shot handler only
    /// counts as used once it has produced a response.
    ///
    /// # Errors
    ///
    /// Propagates the resolver error.
    pub async fn resolve(&self, request: &MockRequest) -> Result<Option<MockResponse>, MockError> {
        if self.once && self.used.swap(true, Ordering::AcqRel) {
            return Ok(None);
        }

        let result = self.resolver.resolve(request).await;
        if self.once && !matches!(result, Ok(Some(_))) {
            self.used.store(false, Ordering::Release);
        }
        result
    }
}

/// An intercepted request, as seen by the handlers.
#[derive(Debug, Clone)]
pub struct MockRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    params: IndexMap<String, String>,
}

impl MockRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: IndexMap::new(),
        }
    }

    /// Creates a request from a method name and an absolute URL.
    ///
    /// # Errors
    ///
    /// Fails if the method or the URL is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mockspec_core::MockRequest;
    ///
    /// let request = MockRequest::parse("GET", "https://example.com/pets?limit=2")?
    ///     .with_header("accept", "application/json")?;
    ///
    /// assert_eq!(request.query_value("limit").as_deref(), Some("2"));
    /// # Ok::<(), mockspec_core::MockError>(())
    /// ```
    pub fn parse(method: &str, url: &str) -> Result<Self, MockError> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
        let url = Url::parse(url)?;
        Ok(Self::new(method, url))
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Fails if the name or the value is not a valid header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, MockError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Sets the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and its content type.
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, MockError> {
        self.body = Bytes::from(serde_json::to_vec(value)?);
        self.headers.typed_insert(ContentType::json());
        Ok(self)
    }

    /// Sets a path parameter, as extracted by the interception layer.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The path parameters.
    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    /// A path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The decoded query parameters, in request order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    /// The first value of a query parameter.
    pub fn query_value(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// A mocked response.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    cookies: Vec<ResponseCookie>,
    body: Option<Bytes>,
}

impl MockResponse {
    /// Creates an empty response with the standard reason phrase.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: None,
        }
    }

    /// The `501 Not Implemented` response.
    #[must_use]
    pub fn not_implemented() -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED).with_body(NOT_IMPLEMENTED)
    }

    /// Creates a JSON response.
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be serialized.
    pub fn from_json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Self, MockError> {
        let body = serde_json::to_vec(value)?;
        let mut response = Self::new(status).with_body(body);
        response.headers.typed_insert(ContentType::json());
        Ok(response)
    }

    /// Replaces the reason phrase.
    #[must_use]
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Replaces the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a side-channel cookie.
    #[must_use]
    pub fn with_cookie(mut self, cookie: ResponseCookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets or clears the body.
    #[must_use]
    pub fn with_optional_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body;
        self
    }

    /// The status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// The headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The side-channel cookies.
    pub fn cookies(&self) -> &[ResponseCookie] {
        &self.cookies
    }

    /// The raw body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The body as text, invalid UTF-8 sequences are replaced.
    pub fn text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    /// The body parsed as JSON.
    ///
    /// # Errors
    ///
    /// Fails if there is no body or if it is not the expected JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, MockError> {
        let body = self.body.as_deref().unwrap_or_default();
        let mut deserializer = serde_json::Deserializer::from_slice(body);
        let value = serde_path_to_error::deserialize(&mut deserializer)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl ResponseResolver for Echo {
        fn resolve<'a>(&'a self, request: &'a MockRequest) -> ResolveFuture<'a> {
            Box::pin(async move {
                if request.query_value("skip").is_some() {
                    return Ok(None);
                }
                Ok(Some(MockResponse::new(StatusCode::OK).with_body(request.url().path().to_string())))
            })
        }
    }

    fn request(url: &str) -> MockRequest {
        MockRequest::parse("get", url).expect("should be a valid request")
    }

    #[tokio::test]
    async fn should_answer_repeatedly_when_standing() {
        let handler = Handler::new(Method::GET, "/echo", Arc::new(Echo));

        for _ in 0..3 {
            let response = handler
                .resolve(&request("http://localhost/echo"))
                .await
                .expect("should resolve");
            assert_eq!(response.and_then(|res| res.text()).as_deref(), Some("/echo"));
        }
        assert!(!handler.is_used());
    }

    #[tokio::test]
    async fn should_answer_once_when_one_shot() {
        let handler = Handler::new(Method::GET, "/echo", Arc::new(Echo)).with_once(true);

        let declined = handler
            .resolve(&request("http://localhost/echo?skip=1"))
            .await
            .expect("should resolve");
        assert_eq!(declined, None);
        assert!(!handler.is_used());

        let first = handler
            .resolve(&request("http://localhost/echo"))
            .await
            .expect("should resolve");
        let second = handler
            .resolve(&request("http://localhost/echo"))
            .await
            .expect("should resolve");
        assert!(first.is_some());
        assert_eq!(second, None);
        assert!(handler.is_used());

        handler.reset();
        let again = handler
            .resolve(&request("http://localhost/echo"))
            .await
            .expect("should resolve");
        assert!(again.is_some());
    }

    #[test]
    fn should_display_handler() {
        let handler = Handler::new(Method::DELETE, "https://api.example.com/pet/:petId", Arc::new(Echo));

        insta::assert_snapshot!(handler, @"DELETE https://api.example.com/pet/:petId");
        insta::assert_snapshot!(format!("{handler:?}"), @r#"Handler { method: DELETE, url: "https://api.example.com/pet/:petId", once: false, used: false, .. }"#);
    }

    #[test]
    fn should_build_not_implemented_response() {
        let response = MockResponse::not_implemented();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.status_text(), "Not Implemented");
        assert_eq!(response.text().as_deref(), Some("Not Implemented"));
    }

    #[test]
    fn should_build_json_response() {
        let response = MockResponse::from_json(StatusCode::CREATED, &serde_json::json!({"id": 1}))
            .expect("should serialize");

        assert_eq!(response.status_text(), "Created");
        assert_eq!(response.header("content-type"), Some("application/json"));
        let body: serde_json::Value = response.json().expect("should parse");
        assert_eq!(body["id"], 1);
    }

    #[test]
    fn should_decode_query_parameters() {
        let request = request("http://localhost/search?q=hello%20world&tag=a&tag=b");

        assert_eq!(request.query_value("q").as_deref(), Some("hello world"));
        insta::assert_debug_snapshot!(request.query_pairs(), @r#"
        [
            (
                "q",
                "hello world",
            ),
            (
                "tag",
                "a",
            ),
            (
                "tag",
                "b",
            ),
        ]
        "#);
    }

    #[test]
    fn should_reject_invalid_request_parts() {
        assert!(matches!(
            MockRequest::parse("GET", "/relative"),
            Err(MockError::UrlError(_))
        ));
        assert!(matches!(
            request("http://localhost/").with_header("bad header", "x"),
            Err(MockError::InvalidHeaderName(_))
        ));
    }
}
