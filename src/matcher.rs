//! Request matching logic.
//!
//! Picks the mock among resolved candidates whose query, header, and body
//! matchers all hold for the incoming request.

use crate::error::MockError;
use crate::model::{json_to_string, Matcher, Mock};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonpath_rust::JsonPath;
use serde_json::Value;
use std::cell::OnceCell;
use tracing::{debug, warn};

/// The parts of an inbound request that matchers look at.
#[derive(Debug)]
pub struct IncomingRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Decoded query pairs in request order
    pub query: Vec<(String, String)>,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

impl<'a> IncomingRequest<'a> {
    pub fn new(
        method: &'a str,
        path: &'a str,
        query_string: Option<&str>,
        headers: &'a HeaderMap,
        body: &'a [u8],
    ) -> Self {
        Self {
            method,
            path,
            query: parse_query_string(query_string.unwrap_or("")),
            headers,
            body,
        }
    }

    pub fn from_parts(parts: &'a Parts, body: &'a [u8]) -> Self {
        Self::new(
            parts.method.as_str(),
            parts.uri.path(),
            parts.uri.query(),
            &parts.headers,
            body,
        )
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Request body parsed as JSON on first use.
struct LazyJsonBody<'a> {
    raw: &'a [u8],
    parsed: OnceCell<Option<Value>>,
}

impl<'a> LazyJsonBody<'a> {
    fn new(raw: &'a [u8]) -> Self {
        Self {
            raw,
            parsed: OnceCell::new(),
        }
    }

    fn json(&self) -> Option<&Value> {
        self.parsed
            .get_or_init(|| match serde_json::from_slice(self.raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(error = %e, "Request body is not valid JSON");
                    None
                }
            })
            .as_ref()
    }
}

/// Select the first candidate whose matchers all hold.
///
/// Candidates are tried in the order given. When more than one matches, the
/// others are logged and the first is returned.
pub fn select_mock(
    candidates: Vec<Mock>,
    request: &IncomingRequest<'_>,
) -> Result<Mock, MockError> {
    if candidates.is_empty() {
        return Err(MockError::NotFound);
    }

    let body = LazyJsonBody::new(request.body);
    let mut matched = candidates
        .into_iter()
        .filter(|mock| matches_mock(mock, request, &body));

    let selected = matched.next().ok_or(MockError::NotMatched)?;
    let also_matched: Vec<i64> = matched.map(|m| m.id).collect();
    if !also_matched.is_empty() {
        warn!(
            mock_id = selected.id,
            also_matched = ?also_matched,
            method = %request.method,
            path = %request.path,
            "Multiple mocks matched request, using the first"
        );
    }

    Ok(selected)
}

fn matches_mock(mock: &Mock, request: &IncomingRequest<'_>, body: &LazyJsonBody<'_>) -> bool {
    matches_query(&mock.request_query_matchers, request)
        && matches_headers(&mock.request_header_matchers, request.headers)
        && matches_body(&mock.request_body_matchers, body)
}

fn matches_query(matchers: &[Matcher], request: &IncomingRequest<'_>) -> bool {
    matchers
        .iter()
        .all(|m| request.query_param(&m.key) == Some(m.expected().as_str()))
}

fn matches_headers(matchers: &[Matcher], headers: &HeaderMap) -> bool {
    // HeaderMap lookups are case-insensitive
    matchers.iter().all(|m| {
        headers
            .get(m.key.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| v == m.expected())
            .unwrap_or(false)
    })
}

fn matches_body(matchers: &[Matcher], body: &LazyJsonBody<'_>) -> bool {
    if matchers.is_empty() {
        return true;
    }
    if body.raw.is_empty() {
        return false;
    }
    match body.json() {
        Some(json) => matchers.iter().all(|m| matches_json_path(json, m)),
        None => false,
    }
}

/// True if any node selected by the matcher's JSONPath key equals its value.
pub fn matches_json_path(json: &Value, matcher: &Matcher) -> bool {
    let path = match JsonPath::<Value>::try_from(matcher.key.as_str()) {
        Ok(p) => p,
        Err(e) => {
            debug!(json_path = %matcher.key, error = %e, "Failed to parse JsonPath");
            return false;
        }
    };

    let expected = matcher.expected();
    match path.find(json) {
        Value::Array(nodes) => nodes.iter().any(|node| json_to_string(node) == expected),
        Value::Null => false,
        node => json_to_string(&node) == expected,
    }
}

/// Parse a query string into decoded key-value pairs.
fn parse_query_string(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MockResponse;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn make_mock(id: i64) -> Mock {
        Mock {
            id,
            method: "GET".to_string(),
            path: Some("/bar".to_string()),
            regex_path: None,
            request_header_matchers: vec![],
            request_query_matchers: vec![],
            request_body_matchers: vec![],
            response: MockResponse::Static {
                status: 200,
                body: json!({ "id": id }),
            },
        }
    }

    fn select(
        candidates: Vec<Mock>,
        query: Option<&str>,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Mock, MockError> {
        let request = IncomingRequest::new("GET", "/bar", query, headers, body);
        select_mock(candidates, &request)
    }

    #[test]
    fn test_empty_candidates_not_found() {
        let result = select(vec![], None, &HeaderMap::new(), b"");
        assert!(matches!(result, Err(MockError::NotFound)));
    }

    #[test]
    fn test_no_matchers_selects_first() {
        let result = select(vec![make_mock(1), make_mock(2)], None, &HeaderMap::new(), b"");
        assert_eq!(result.unwrap().id, 1);
    }

    #[test]
    fn test_query_matching() {
        let mut three = make_mock(1);
        three.request_query_matchers = vec![Matcher::new("id", 3)];
        let mut four = make_mock(2);
        four.request_query_matchers = vec![Matcher::new("id", "4")];
        let candidates = vec![three, four];
        let headers = HeaderMap::new();

        let result = select(candidates.clone(), Some("id=3"), &headers, b"");
        assert_eq!(result.unwrap().id, 1);

        let result = select(candidates.clone(), Some("id=4"), &headers, b"");
        assert_eq!(result.unwrap().id, 2);

        let result = select(candidates.clone(), Some("id=5"), &headers, b"");
        assert!(matches!(result, Err(MockError::NotMatched)));

        let result = select(candidates, None, &headers, b"");
        assert!(matches!(result, Err(MockError::NotMatched)));
    }

    #[test]
    fn test_header_matching() {
        let mut mock = make_mock(1);
        mock.request_header_matchers = vec![Matcher::new("foo", "bar")];

        let result = select(vec![mock.clone()], None, &HeaderMap::new(), b"");
        assert!(matches!(result, Err(MockError::NotMatched)));

        let mut headers = HeaderMap::new();
        headers.insert("foo", HeaderValue::from_static("bar"));
        assert_eq!(select(vec![mock.clone()], None, &headers, b"").unwrap().id, 1);

        let mut headers = HeaderMap::new();
        headers.insert("foo", HeaderValue::from_static("Bar"));
        assert!(select(vec![mock], None, &headers, b"").is_err());
    }

    #[test]
    fn test_header_key_lookup_is_case_insensitive() {
        let mut mock = make_mock(1);
        mock.request_header_matchers = vec![Matcher::new("X-Tenant", "acme")];
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", HeaderValue::from_static("acme"));
        assert!(select(vec![mock], None, &headers, b"").is_ok());
    }

    #[test]
    fn test_body_json_path_matching() {
        let mut mock = make_mock(1);
        mock.request_body_matchers = vec![Matcher::new("$.foo", "bar")];
        let headers = HeaderMap::new();

        let result = select(vec![mock.clone()], None, &headers, br#"{"foo": "bar"}"#);
        assert_eq!(result.unwrap().id, 1);

        let result = select(vec![mock.clone()], None, &headers, br#"{"foo": "baz"}"#);
        assert!(matches!(result, Err(MockError::NotMatched)));

        let result = select(vec![mock.clone()], None, &headers, b"");
        assert!(matches!(result, Err(MockError::NotMatched)));

        let result = select(vec![mock], None, &headers, b"not json");
        assert!(matches!(result, Err(MockError::NotMatched)));
    }

    #[test]
    fn test_whole_number_floats_match_integers() {
        let mut mock = make_mock(1);
        mock.request_query_matchers = vec![Matcher::new("id", 3.0)];
        let result = select(vec![mock], Some("id=3"), &HeaderMap::new(), b"");
        assert_eq!(result.unwrap().id, 1);

        let body = json!({ "n": 3.0 });
        assert!(matches_json_path(&body, &Matcher::new("$.n", 3)));
    }

    #[test]
    fn test_body_matcher_any_node() {
        let body = json!({ "items": [ { "sku": "a1" }, { "sku": "b2" } ], "count": 2 });
        assert!(matches_json_path(&body, &Matcher::new("$.items[*].sku", "b2")));
        assert!(matches_json_path(&body, &Matcher::new("$.count", 2)));
        assert!(matches_json_path(&body, &Matcher::new("$.count", "2")));
        assert!(!matches_json_path(&body, &Matcher::new("$.items[*].sku", "c3")));
        assert!(!matches_json_path(&body, &Matcher::new("$.missing", "x")));
    }

    #[test]
    fn test_body_matching_is_repeatable() {
        let body = json!({ "user": { "role": "admin" } });
        let matcher = Matcher::new("$.user.role", "admin");
        let first = matches_json_path(&body, &matcher);
        let second = matches_json_path(&body, &matcher);
        assert!(first);
        assert_eq!(first, second);
        assert_eq!(body, json!({ "user": { "role": "admin" } }));
    }

    #[test]
    fn test_all_predicate_kinds_must_hold() {
        let mut mock = make_mock(1);
        mock.request_query_matchers = vec![Matcher::new("page", "1")];
        mock.request_header_matchers = vec![Matcher::new("foo", "bar")];
        mock.request_body_matchers = vec![Matcher::new("$.name", "John")];

        let mut headers = HeaderMap::new();
        headers.insert("foo", HeaderValue::from_static("bar"));
        let body = br#"{"name": "John"}"#;

        assert!(select(vec![mock.clone()], Some("page=1"), &headers, body).is_ok());
        assert!(select(vec![mock.clone()], Some("page=2"), &headers, body).is_err());
        assert!(select(vec![mock.clone()], Some("page=1"), &HeaderMap::new(), body).is_err());
        assert!(select(vec![mock], Some("page=1"), &headers, br#"{"name": "Jane"}"#).is_err());
    }

    #[test]
    fn test_first_of_multiple_matches_wins() {
        let mut specific = make_mock(2);
        specific.request_query_matchers = vec![Matcher::new("id", "3")];
        let candidates = vec![make_mock(1), specific];
        let result = select(candidates, Some("id=3"), &HeaderMap::new(), b"");
        assert_eq!(result.unwrap().id, 1);
    }

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("foo=bar&baz=qux&foo=second");
        assert_eq!(params[0], ("foo".to_string(), "bar".to_string()));
        assert_eq!(params.len(), 3);

        let params = parse_query_string("name=John%20Doe&city=New+York");
        assert_eq!(params[0].1, "John Doe");
        assert_eq!(params[1].1, "New York");
    }

    #[test]
    fn test_query_param_uses_first_value() {
        let headers = HeaderMap::new();
        let request = IncomingRequest::new("GET", "/bar", Some("id=1&id=2"), &headers, b"");
        assert_eq!(request.query_param("id"), Some("1"));
        assert_eq!(request.query_param("missing"), None);
    }
}
