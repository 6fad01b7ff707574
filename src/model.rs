//! Mock definitions and their structural validation.
//!
//! A [`Mock`] pairs a request shape (method, exact or regex path, matchers)
//! with either a canned response or an upstream proxy target.

use axum::http::StatusCode;
use jsonpath_rust::JsonPath;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HTTP methods a mock may be registered for.
pub const HTTP_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

pub const CAN_NOT_BE_EMPTY: &str = "can not be empty";
pub const INVALID_VALUE: &str = "Invalid value";
pub const INVALID_PATH: &str = "Invalid path. Either 'path' or 'regexPath' must be provided.";
pub const INVALID_REGEX: &str = "Invalid regexPath.";
pub const INVALID_HEADER_MATCHER: &str = "Invalid HeaderMatcher. Both values must be provided.";
pub const INVALID_QUERY_MATCHER: &str = "Invalid QueryMatcher. Both values must be provided.";
pub const INVALID_BODY_MATCHER: &str = "Invalid BodyMatcher. Both values must be provided.";
pub const INVALID_BODY_MATCHER_JSON_PATH: &str =
    "Invalid BodyMatcher. Cannot parse key value as JsonPath.";
pub const MIXED_RESPONSE: &str =
    "response must be either a static 'status'/'body' or a 'proxy', not both";
pub const INVALID_PROXY: &str =
    "Invalid proxy. An enabled proxy with a non-empty hostUrl must be provided.";

/// A stored mock definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mock {
    /// Assigned by the store on save
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub method: String,

    /// Literal request path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Regular expression searched within the request path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_path: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_header_matchers: Vec<Matcher>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_query_matchers: Vec<Matcher>,

    /// Matchers whose key is a JSONPath expression
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_body_matchers: Vec<Matcher>,

    pub response: MockResponse,
}

impl Mock {
    /// The literal path, if set and non-empty.
    pub fn exact_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }

    /// The regex path, if set and non-empty.
    pub fn regex_pattern(&self) -> Option<&str> {
        self.regex_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Validate the definition field by field.
    ///
    /// Returns every violation found, in field order. An empty list means the
    /// mock may be persisted.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        self.validate_method(&mut violations);
        self.validate_status(&mut violations);
        self.validate_path(&mut violations);
        validate_pairs(
            &self.request_header_matchers,
            "requestHeaderMatchers",
            INVALID_HEADER_MATCHER,
            &mut violations,
        );
        validate_pairs(
            &self.request_query_matchers,
            "requestQueryMatchers",
            INVALID_QUERY_MATCHER,
            &mut violations,
        );
        self.validate_body_matchers(&mut violations);
        self.validate_proxy(&mut violations);

        violations
    }

    fn validate_method(&self, violations: &mut Vec<Violation>) {
        if self.method.is_empty() {
            violations.push(Violation::new(
                "method",
                format!("'method' {}", CAN_NOT_BE_EMPTY),
            ));
        } else if !HTTP_METHODS.contains(&self.method.as_str()) {
            violations.push(Violation::new(
                "method",
                format!("method - {}: [{}]", INVALID_VALUE, self.method),
            ));
        }
    }

    fn validate_status(&self, violations: &mut Vec<Violation>) {
        if let MockResponse::Static { status, .. } = &self.response {
            let known = StatusCode::from_u16(*status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .is_some();
            if !known {
                violations.push(Violation::new(
                    "status",
                    format!("status - {}: [{}]", INVALID_VALUE, status),
                ));
            }
        }
    }

    fn validate_path(&self, violations: &mut Vec<Violation>) {
        if self.exact_path().is_some() == self.regex_pattern().is_some() {
            violations.push(Violation::new("path", INVALID_PATH));
        }
        if let Some(pattern) = self.regex_pattern() {
            if Regex::new(pattern).is_err() {
                violations.push(Violation::new(
                    "regexPath",
                    format!("{} {} is not a valid expression.", INVALID_REGEX, pattern),
                ));
            }
        }
    }

    fn validate_body_matchers(&self, violations: &mut Vec<Violation>) {
        for matcher in &self.request_body_matchers {
            if matcher.is_incomplete() {
                violations.push(Violation::new("requestBodyMatchers", INVALID_BODY_MATCHER));
                break;
            }
            if !matcher.key.starts_with('$')
                || JsonPath::<Value>::try_from(matcher.key.as_str()).is_err()
            {
                violations.push(Violation::new(
                    "requestBodyMatchers",
                    INVALID_BODY_MATCHER_JSON_PATH,
                ));
                break;
            }
        }
    }

    fn validate_proxy(&self, violations: &mut Vec<Violation>) {
        if let MockResponse::Proxy { proxy } = &self.response {
            if !proxy.enabled || proxy.host_url.is_empty() {
                violations.push(Violation::new("response", INVALID_PROXY));
            }
        }
    }
}

fn validate_pairs(
    matchers: &[Matcher],
    field: &'static str,
    message: &'static str,
    violations: &mut Vec<Violation>,
) {
    if matchers.iter().any(Matcher::is_incomplete) {
        violations.push(Violation::new(field, message));
    }
}

/// A key/value predicate on one part of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matcher {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

impl Matcher {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The expected value in the string form requests are compared against.
    pub fn expected(&self) -> String {
        json_to_string(&self.value)
    }

    fn is_incomplete(&self) -> bool {
        self.key.is_empty() || self.value.is_null() || self.expected().is_empty()
    }
}

/// What a matched mock answers with.
///
/// A definition carries exactly one of the two shapes. Mixing `proxy` with
/// `status` or `body` is rejected when parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawResponse")]
pub enum MockResponse {
    /// Forward to an upstream host
    Proxy { proxy: ProxySettings },
    /// Canned status and JSON body
    Static {
        status: u16,
        #[serde(default)]
        body: Value,
    },
}

#[derive(Deserialize)]
struct RawResponse {
    status: Option<u16>,
    body: Option<Value>,
    proxy: Option<ProxySettings>,
}

impl TryFrom<RawResponse> for MockResponse {
    type Error = String;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        match (raw.proxy, raw.status) {
            (Some(_), Some(_)) => Err(MIXED_RESPONSE.to_string()),
            (Some(_), None) if raw.body.is_some() => Err(MIXED_RESPONSE.to_string()),
            (Some(proxy), None) => Ok(MockResponse::Proxy { proxy }),
            (None, Some(status)) => Ok(MockResponse::Static {
                status,
                body: raw.body.unwrap_or_default(),
            }),
            (None, None) => Err("response requires either 'status' or 'proxy'".to_string()),
        }
    }
}

impl MockResponse {
    /// The upstream host, when this response forwards to an enabled proxy.
    pub fn proxy_target(&self) -> Option<&str> {
        match self {
            MockResponse::Proxy { proxy } if proxy.enabled && !proxy.host_url.is_empty() => {
                Some(proxy.host_url.as_str())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host_url: String,
}

/// Minimal projection of a regex-path mock used for fallback scanning.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    pub id: i64,
    pub method: String,
    pub regex_path: Regex,
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// String form used when comparing JSON values against request text.
///
/// Whole-number floats print without a fraction, so `3.0` compares as `3`.
pub fn json_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
