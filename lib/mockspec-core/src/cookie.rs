use std::fmt;

use indexmap::IndexMap;

/// A cookie set by a mocked response.
///
/// Cookies are not returned as `Set-Cookie` headers, the interception layer
/// applies them through its own cookie store.
///
/// # Example
///
/// ```rust
/// use mockspec_core::ResponseCookie;
///
/// let cookie = ResponseCookie::parse("session=abc; Path=/; HttpOnly").expect("a cookie");
/// assert_eq!(cookie.name, "session");
/// assert_eq!(cookie.value, "abc");
/// assert_eq!(cookie.attribute("path"), Some("/"));
/// assert!(cookie.has_attribute("httponly"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Attributes in declaration order, flags have no value.
    pub attributes: IndexMap<String, Option<String>>,
}

impl ResponseCookie {
    /// Creates a cookie without attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Parses a single `Set-Cookie` value.
    ///
    /// Returns `None` when the value has no `name=value` pair.
    #[must_use]
    pub fn parse(set_cookie: &str) -> Option<Self> {
        let mut parts = set_cookie.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let attributes = parts
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
                None => (part.to_string(), None),
            })
            .collect();

        Some(Self {
            name: name.to_string(),
            value: unquote(value.trim()).to_string(),
            attributes,
        })
    }

    /// Parses a header value that may hold several cookies, one per line.
    #[must_use]
    pub fn parse_all(header_value: &str) -> Vec<Self> {
        header_value
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(Self::parse)
            .collect()
    }

    /// Value of an attribute, looked up case-insensitively.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Whether an attribute or flag is present, looked up case-insensitively.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.keys().any(|key| key.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ResponseCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        for (key, value) in &self.attributes {
            match value {
                Some(value) => write!(f, "; {key}={value}")?,
                None => write!(f, "; {key}")?,
            }
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}
