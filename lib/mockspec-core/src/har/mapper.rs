use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{CONTENT_ENCODING, HeaderName, HeaderValue, SET_COOKIE};
use http::{HeaderMap, StatusCode};
use percent_encoding::percent_decode_str;
use tracing::warn;

use super::archive::{Content, NameValue, Response};
use crate::{MockError, MockResponse, ResponseCookie};

const SET_COOKIE2: &str = "set-cookie2";

/// Rebuilds the recorded response.
///
/// Cookies are moved to the response side channel and `Content-Encoding` is
/// dropped, since replayed bodies are never compressed.
///
/// # Errors
///
/// Fails if the recorded status is not a valid status code.
pub fn to_response(recorded: &Response) -> Result<MockResponse, MockError> {
    let status = StatusCode::from_u16(recorded.status).map_err(|error| {
        MockError::invalid_document(format!("recorded status {}: {error}", recorded.status))
    })?;

    let mut headers = HeaderMap::new();
    let mut cookies = Vec::new();
    for NameValue { name, value } in &recorded.headers {
        if name.eq_ignore_ascii_case(SET_COOKIE.as_str()) || name.eq_ignore_ascii_case(SET_COOKIE2) {
            cookies.extend(ResponseCookie::parse_all(value));
            continue;
        }
        if name.eq_ignore_ascii_case(CONTENT_ENCODING.as_str()) {
            continue;
        }

        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(MockError::from)
            .and_then(|header| Ok((header, HeaderValue::from_str(value)?)));
        match header {
            Ok((header, value)) => {
                headers.append(header, value);
            }
            Err(error) => warn!(%name, %error, "skipping recorded header"),
        }
    }

    let status_text = if recorded.status_text.is_empty() {
        status.canonical_reason().unwrap_or_default().to_string()
    } else {
        recorded.status_text.clone()
    };

    let response = cookies.into_iter().fold(
        MockResponse::new(status)
            .with_status_text(status_text)
            .with_headers(headers)
            .with_optional_body(decode_body(&recorded.content)),
        MockResponse::with_cookie,
    );
    Ok(response)
}

/// The recorded body, base64-decoded when it is encoded text.
///
/// Binary bodies stay encoded, compressed bodies are not supported.
#[must_use]
pub fn decode_body(content: &Content) -> Option<Bytes> {
    let text = content.text.as_ref()?;
    let is_base64 = content
        .encoding
        .as_deref()
        .is_some_and(|encoding| encoding.eq_ignore_ascii_case("base64"));

    if is_base64 && content.mime_type.contains("text") {
        match STANDARD.decode(text) {
            Ok(decoded) => return Some(Bytes::from(decoded)),
            Err(error) => warn!(mime_type = %content.mime_type, %error, "cannot decode recorded body"),
        }
    }
    Some(Bytes::from(text.clone()))
}

/// Whether the live query string matches the recorded parameters exactly.
///
/// Recorded values are URL-decoded before comparison. Order does not matter,
/// repeated parameters match as a set and extra live parameters fail.
#[must_use]
pub fn matches_query_parameters(live: &[(String, String)], recorded: &[NameValue]) -> bool {
    let mut remaining = live.to_vec();
    for NameValue { name, value } in recorded {
        let value = percent_decode_str(&value.replace('+', " "))
            .decode_utf8_lossy()
            .into_owned();
        let before = remaining.len();
        remaining.retain(|(live_name, live_value)| live_name != name || *live_value != value);
        if remaining.len() == before {
            return false;
        }
    }
    remaining.is_empty()
}

/// The delay to wait before replaying a response recorded with `time`
/// milliseconds.
#[must_use]
pub fn replay_delay(time: Option<f64>) -> Option<Duration> {
    time.filter(|time| time.is_finite() && *time > 0.0)
        .and_then(|time| Duration::try_from_secs_f64(time / 1000.0).ok())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    fn recorded(query: &[(&str, &str)]) -> Vec<NameValue> {
        query.iter().map(|(name, value)| NameValue::new(*name, *value)).collect()
    }

    #[rstest]
    #[case::same_order(&[("a", "1"), ("b", "2")], true)]
    #[case::other_order(&[("b", "2"), ("a", "1")], true)]
    #[case::missing(&[("a", "1")], false)]
    #[case::extra(&[("a", "1"), ("b", "2"), ("c", "3")], false)]
    #[case::other_value(&[("a", "1"), ("b", "3")], false)]
    #[case::case_sensitive(&[("A", "1"), ("b", "2")], false)]
    fn should_match_query_strictly(#[case] live: &[(&str, &str)], #[case] expected: bool) {
        let recorded = recorded(&[("a", "1"), ("b", "2")]);

        assert_eq!(matches_query_parameters(&pairs(live), &recorded), expected);
    }

    #[test]
    fn should_decode_recorded_values() {
        let recorded = recorded(&[("q", "hello%20world"), ("tag", "a+b")]);

        assert!(matches_query_parameters(
            &pairs(&[("tag", "a b"), ("q", "hello world")]),
            &recorded
        ));
    }

    #[test]
    fn should_match_repeated_parameters_as_set() {
        let recorded = recorded(&[("id", "1"), ("id", "2")]);

        assert!(matches_query_parameters(&pairs(&[("id", "2"), ("id", "1")]), &recorded));
        assert!(!matches_query_parameters(&pairs(&[("id", "1"), ("id", "1")]), &recorded));
    }

    #[test]
    fn should_rebuild_response() {
        let recorded = Response {
            status: 201,
            status_text: "Created!".to_string(),
            headers: vec![
                NameValue::new("Content-Type", "text/plain"),
                NameValue::new("Content-Encoding", "gzip"),
                NameValue::new("Set-Cookie", "session=abc; Path=/\ntheme=dark"),
                NameValue::new("X-Trace", "t-1"),
            ],
            content: Content {
                size: Some(5),
                mime_type: "text/plain".to_string(),
                text: Some(STANDARD.encode("hello")),
                encoding: Some("base64".to_string()),
            },
        };

        let response = to_response(&recorded).expect("should map");

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.status_text(), "Created!");
        assert_eq!(response.text().as_deref(), Some("hello"));
        insta::assert_debug_snapshot!(response.headers(), @r#"
        {
            "content-type": "text/plain",
            "x-trace": "t-1",
        }
        "#);
        let cookies = response.cookies().iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(cookies, ["session=abc; Path=/", "theme=dark"]);
    }

    #[rstest]
    #[case::plain_text("text/plain", None, "aGk=", "aGk=")]
    #[case::encoded_text("text/html", Some("base64"), "aGk=", "hi")]
    #[case::encoded_binary("image/png", Some("base64"), "aGk=", "aGk=")]
    #[case::invalid_base64("text/plain", Some("base64"), "not base64!", "not base64!")]
    fn should_decode_body(
        #[case] mime_type: &str,
        #[case] encoding: Option<&str>,
        #[case] text: &str,
        #[case] expected: &str,
    ) {
        let content = Content {
            size: None,
            mime_type: mime_type.to_string(),
            text: Some(text.to_string()),
            encoding: encoding.map(str::to_string),
        };

        assert_eq!(decode_body(&content), Some(Bytes::from(expected.to_string())));
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(-1.0), None)]
    #[case(Some(f64::NAN), None)]
    #[case(Some(250.0), Some(Duration::from_millis(250)))]
    fn should_compute_replay_delay(#[case] time: Option<f64>, #[case] expected: Option<Duration>) {
        assert_eq!(replay_delay(time), expected);
    }
}
