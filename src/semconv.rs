//! OpenTelemetry semantic-convention keys and the derivations built on them.
//!
//! Attribute names follow the current HTTP semantic conventions
//! (`http.request.method`, `http.route`, ...). The status-code mapping is
//! pinned here and in the tests below rather than imported, so upgrading the
//! conventions can never silently reclassify spans.

use http::{Method, StatusCode};
use opentelemetry::trace::Status;

pub(crate) const SERVICE_NAME: &str = "service.name";
pub(crate) const HTTP_REQUEST_METHOD: &str = "http.request.method";
pub(crate) const HTTP_RESPONSE_STATUS_CODE: &str = "http.response.status_code";
pub(crate) const HTTP_ROUTE: &str = "http.route";
pub(crate) const URL_PATH: &str = "url.path";
pub(crate) const SERVER_ADDRESS: &str = "server.address";
pub(crate) const USER_AGENT_ORIGINAL: &str = "user_agent.original";
pub(crate) const NETWORK_PROTOCOL_NAME: &str = "network.protocol.name";

/// Span status for a recorded HTTP response status code.
///
/// 1xx-3xx map to `Ok`. 4xx and 5xx map to `Error` carrying the canonical
/// reason phrase. Anything outside the valid range (including `0`, meaning
/// the handler never wrote at all) is an error with an explicit description.
pub(crate) fn span_status(status: u16) -> Status {
    match status {
        100..=399 => Status::Ok,
        400..=599 => Status::error(reason(status)),
        _ => Status::error(format!("invalid HTTP status code {status}")),
    }
}

fn reason(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default()
        .to_owned()
}

/// Span name for a resolved route pattern.
///
/// Routers report the root route as an empty pattern; it is normalized to
/// `/` so span names are never blank. With `method_in_name` the HTTP method
/// is prefixed (`GET /users/{id}`), which some tracing vendors need to group
/// spans usefully.
pub(crate) fn span_name(method_in_name: bool, method: &Method, pattern: &str) -> String {
    let pattern = if pattern.is_empty() { "/" } else { pattern };
    if method_in_name {
        format!("{method} {pattern}")
    } else {
        pattern.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_redirect_codes_are_ok() {
        assert_eq!(span_status(200), Status::Ok);
        assert_eq!(span_status(204), Status::Ok);
        assert_eq!(span_status(302), Status::Ok);
    }

    #[test]
    fn client_and_server_errors_carry_reason_phrases() {
        assert_eq!(span_status(404), Status::error("Not Found"));
        assert_eq!(span_status(500), Status::error("Internal Server Error"));
    }

    #[test]
    fn out_of_range_codes_are_invalid() {
        assert_eq!(
            span_status(0),
            Status::error("invalid HTTP status code 0".to_owned()),
        );
        assert_eq!(
            span_status(600),
            Status::error("invalid HTTP status code 600".to_owned()),
        );
    }

    #[test]
    fn root_pattern_normalizes_to_slash() {
        assert_eq!(span_name(false, &Method::GET, ""), "/");
        assert_eq!(span_name(true, &Method::GET, ""), "GET /");
    }

    #[test]
    fn method_prefix_is_opt_in() {
        assert_eq!(span_name(false, &Method::GET, "/users/{id}"), "/users/{id}");
        assert_eq!(span_name(true, &Method::DELETE, "/users/{id}"), "DELETE /users/{id}");
    }
}
