use http::StatusCode;
use indexmap::IndexMap;
use tracing::debug;

use super::Response;
use crate::MockRequest;
use crate::config::OverrideParams;

const DEFAULT_KEY: &str = "default";

/// Outcome of the response selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    /// A declared response to send with the given status.
    Response {
        /// Status sent to the client, `200` for a `default` response.
        status: StatusCode,
        /// The declared response.
        response: &'a Response,
    },
    /// Nothing suitable is declared, a 501 must be sent.
    NotImplemented,
}

/// Picks the declared response to send.
///
/// The override query parameter (`?response=404`) must name a declared
/// status, otherwise the request is not implemented. Without override, the
/// lowest declared `2xx` status wins, then a `2XX` range, then `default`.
#[must_use]
pub fn select_response<'a>(
    responses: Option<&'a IndexMap<String, Response>>,
    request: &MockRequest,
    overrides: &OverrideParams,
) -> Selection<'a> {
    let Some(responses) = responses.filter(|responses| !responses.is_empty()) else {
        return Selection::NotImplemented;
    };

    if let Some(forced) = request.query_value(&overrides.response) {
        let selection = responses
            .get_key_value(forced.as_str())
            .and_then(|(key, response)| {
                let status = key.parse::<u16>().ok()?;
                let status = StatusCode::from_u16(status).ok()?;
                Some(Selection::Response { status, response })
            })
            .unwrap_or(Selection::NotImplemented);
        debug!(%forced, ?selection, "response forced by query parameter");
        return selection;
    }

    let success = responses
        .iter()
        .filter_map(|(key, response)| {
            let status = StatusCode::from_u16(key.parse().ok()?).ok()?;
            status.is_success().then_some((status, response))
        })
        .min_by_key(|(status, _)| *status);
    if let Some((status, response)) = success {
        return Selection::Response { status, response };
    }

    responses
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("2XX"))
        .or_else(|| responses.get_key_value(DEFAULT_KEY))
        .map_or(Selection::NotImplemented, |(_, response)| {
            Selection::Response {
                status: StatusCode::OK,
                response,
            }
        })
}
