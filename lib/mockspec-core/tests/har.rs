#![allow(missing_docs)]

use std::time::Duration;

use assert2::{check, let_assert};
use http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use mockspec_core::har::HarHandlerBuilder;
use mockspec_core::{MockConfig, MockError};

mod common;
pub use self::common::*;

fn entry(method: &str, url: &str, body: &str, query: &[(&str, &str)]) -> Value {
    let query = query
        .iter()
        .map(|(name, value)| json!({"name": name, "value": value}))
        .collect::<Vec<_>>();
    json!({
        "startedDateTime": "2024-05-01T08:00:00.000Z",
        "time": 120.0,
        "request": {
            "method": method,
            "url": url,
            "httpVersion": "HTTP/1.1",
            "headers": [],
            "queryString": query
        },
        "response": {
            "status": 200,
            "statusText": "OK",
            "headers": [{"name": "Content-Type", "value": "text/plain"}],
            "content": {"size": body.len(), "mimeType": "text/plain", "text": body}
        }
    })
}

fn archive(entries: Vec<Value>) -> Value {
    json!({"log": {"version": "1.2", "creator": {"name": "test", "version": "1"}, "entries": entries}})
}

fn without_delay() -> MockConfig {
    MockConfig::default().with_replay_delay(false)
}

#[fixture]
fn replay() -> Interceptor {
    init_tracing();
    let handlers = mockspec_core::from_traffic(
        archive(vec![
            entry("GET", "https://api.example.com/resource", "one", &[]),
            entry("GET", "https://api.example.com/other", "other", &[]),
            entry("GET", "https://api.example.com/resource", "two", &[]),
        ]),
        without_delay(),
    );
    match handlers {
        Ok(handlers) => Interceptor::new(handlers),
        Err(error) => panic!("fail to build replay handlers: {error}"),
    }
}

#[rstest]
#[tokio::test]
async fn should_replay_in_recording_order(replay: Interceptor) -> anyhow::Result<()> {
    let mut bodies = Vec::new();
    for _ in 0..3 {
        let_assert!(Some(response) = replay.send("GET", "https://api.example.com/resource").await?);
        bodies.push(response.text().unwrap_or_default());
    }

    check!(bodies == ["one", "two", "two"]);
    Ok(())
}

#[rstest]
#[case::same_order("?a=1&b=2", true)]
#[case::other_order("?b=2&a=1", true)]
#[case::missing("?a=1", false)]
#[case::extra("?a=1&b=2&c=3", false)]
#[case::no_query("", false)]
#[tokio::test]
async fn should_match_recorded_query_strictly(#[case] query: &str, #[case] matches: bool) -> anyhow::Result<()> {
    init_tracing();
    let handlers = mockspec_core::from_traffic(
        archive(vec![entry(
            "GET",
            "https://api.example.com/search?a=1&b=2",
            "found",
            &[("a", "1"), ("b", "2")],
        )]),
        without_delay(),
    )?;
    let interceptor = Interceptor::new(handlers);

    let response = interceptor
        .send("GET", &format!("https://api.example.com/search{query}"))
        .await?;

    check!(response.is_some() == matches);
    Ok(())
}

#[rstest]
#[case::plain("", Some("plain"))]
#[case::paged("?page=2", Some("paged"))]
#[case::unknown("?foo=1", None)]
#[tokio::test]
async fn should_decline_extra_query_on_unqueried_entry(
    #[case] query: &str,
    #[case] expected: Option<&str>,
) -> anyhow::Result<()> {
    init_tracing();
    let handlers = mockspec_core::from_traffic(
        archive(vec![
            entry("GET", "https://api.example.com/items", "plain", &[]),
            entry("GET", "https://api.example.com/items?page=2", "paged", &[("page", "2")]),
        ]),
        without_delay(),
    )?;
    let interceptor = Interceptor::new(handlers);

    let response = interceptor
        .send("GET", &format!("https://api.example.com/items{query}"))
        .await?;

    check!(response.and_then(|response| response.text()).as_deref() == expected);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn should_wait_for_recorded_time() -> anyhow::Result<()> {
    init_tracing();
    let handlers = HarHandlerBuilder::from_value(archive(vec![entry(
        "GET",
        "https://api.example.com/slow",
        "late",
        &[],
    )]))?
    .build()?;
    let interceptor = Interceptor::new(handlers);

    let start = tokio::time::Instant::now();
    let response = interceptor
        .send("GET", "https://api.example.com/slow")
        .await?
        .expect("should respond");

    check!(start.elapsed() >= Duration::from_millis(120));
    check!(response.text().as_deref() == Some("late"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn should_skip_delay_when_disabled() -> anyhow::Result<()> {
    let handlers = mockspec_core::from_traffic(
        archive(vec![entry("GET", "https://api.example.com/slow", "late", &[])]),
        without_delay(),
    )?;
    let interceptor = Interceptor::new(handlers);

    let start = tokio::time::Instant::now();
    interceptor.send("GET", "https://api.example.com/slow").await?;

    assert_eq!(start.elapsed(), Duration::ZERO);
    Ok(())
}

#[tokio::test]
async fn should_move_cookies_to_side_channel() -> anyhow::Result<()> {
    let mut recorded = entry("POST", "https://api.example.com/login", "welcome", &[]);
    recorded["response"]["headers"] = json!([
        {"name": "Content-Type", "value": "text/plain"},
        {"name": "Set-Cookie", "value": "session=s3cr3t; Path=/; HttpOnly"},
        {"name": "Content-Encoding", "value": "br"}
    ]);
    recorded["response"]["status"] = json!(201);
    recorded["response"]["statusText"] = json!("Logged In");
    let interceptor = Interceptor::new(mockspec_core::from_traffic(archive(vec![recorded]), without_delay())?);

    let response = interceptor
        .send("POST", "https://api.example.com/login")
        .await?
        .expect("should respond");

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.status_text(), "Logged In");
    assert_eq!(response.header("set-cookie"), None);
    assert_eq!(response.header("content-encoding"), None);
    insta::assert_debug_snapshot!(response.cookies(), @r#"
    [
        ResponseCookie {
            name: "session",
            value: "s3cr3t",
            attributes: {
                "Path": Some(
                    "/",
                ),
                "HttpOnly": None,
            },
        },
    ]
    "#);
    Ok(())
}

#[tokio::test]
async fn should_decode_base64_text_bodies() -> anyhow::Result<()> {
    let mut recorded = entry("GET", "https://api.example.com/hello", "", &[]);
    recorded["response"]["content"] = json!({"mimeType": "text/plain; charset=utf-8", "text": "aGVsbG8gd29ybGQ=", "encoding": "base64"});
    let interceptor = Interceptor::new(mockspec_core::from_traffic(archive(vec![recorded]), without_delay())?);

    let response = interceptor
        .send("GET", "https://api.example.com/hello")
        .await?
        .expect("should respond");

    assert_eq!(response.text().as_deref(), Some("hello world"));
    Ok(())
}

#[rstest]
#[case::null(Value::Null, "Failed to generate request handlers from traffic: expected an HAR object but got nothing")]
#[case::empty(archive(vec![]), "Failed to generate request handlers from traffic: given HAR object has no entries")]
fn should_reject_unusable_archives(#[case] har: Value, #[case] expected: &str) {
    let error = mockspec_core::from_traffic(har, MockConfig::default()).expect_err("should fail");

    assert!(matches!(error, MockError::MissingArchive | MockError::EmptyArchive));
    assert_eq!(error.to_string(), expected);
}
