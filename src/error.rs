use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::http::extract_rate_from_rest;
use crate::types::ApiBody;

/// Which failure the GitHub API reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubErrorKind {
    Validation,
    NotFound,
    Authentication,
    Permission,
    RateLimit { reset_at: DateTime<Utc> },
    Conflict,
    Api,
}

/// A non-2xx response from the GitHub API.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct GitHubError {
    pub kind: GitHubErrorKind,
    pub status: StatusCode,
    pub message: String,
    pub body: Value,
}

impl GitHubError {
    /// Map a failed response onto one of the error kinds.
    pub fn classify(status: StatusCode, headers: &HeaderMap, body: ApiBody) -> Self {
        let message = upstream_message(&body);
        let body = body.into_value();
        let rate = extract_rate_from_rest(headers);
        let kind = match status {
            StatusCode::UNAUTHORIZED => GitHubErrorKind::Authentication,
            StatusCode::NOT_FOUND => GitHubErrorKind::NotFound,
            StatusCode::CONFLICT => GitHubErrorKind::Conflict,
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                GitHubErrorKind::Validation
            }
            StatusCode::TOO_MANY_REQUESTS => GitHubErrorKind::RateLimit {
                reset_at: reset_time(headers, rate.reset_at),
            },
            // Secondary limits keep quota but send Retry-After.
            StatusCode::FORBIDDEN if rate.is_exhausted() || headers.contains_key(RETRY_AFTER) => {
                GitHubErrorKind::RateLimit {
                    reset_at: reset_time(headers, rate.reset_at),
                }
            }
            StatusCode::FORBIDDEN => GitHubErrorKind::Permission,
            _ => GitHubErrorKind::Api,
        };
        Self {
            kind,
            status,
            message,
            body,
        }
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self.kind {
            GitHubErrorKind::RateLimit { reset_at } => Some(reset_at),
            _ => None,
        }
    }

    /// Render a message suitable for a tool caller.
    pub fn describe(&self) -> String {
        match &self.kind {
            GitHubErrorKind::Validation => {
                let mut out = format!("Validation Error: {}", self.message);
                if !self.body.is_null() {
                    out.push_str(&format!("\nDetails: {}", self.body));
                }
                out
            }
            GitHubErrorKind::NotFound => format!("Not Found: {}", self.message),
            GitHubErrorKind::Authentication => format!("Authentication Failed: {}", self.message),
            GitHubErrorKind::Permission => format!("Permission Denied: {}", self.message),
            GitHubErrorKind::RateLimit { reset_at } => format!(
                "Rate Limit Exceeded: {}\nResets at: {}",
                self.message,
                reset_at.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            GitHubErrorKind::Conflict => format!("Conflict: {}", self.message),
            GitHubErrorKind::Api => format!("GitHub API Error: {}", self.message),
        }
    }
}

fn upstream_message(body: &ApiBody) -> String {
    let msg = match body {
        ApiBody::Json(v) => v.get("message").and_then(|m| m.as_str()).map(str::to_string),
        ApiBody::Text(s) => Some(s.trim().to_string()),
    };
    msg.filter(|m| !m.is_empty())
        .unwrap_or_else(|| "GitHub API error".to_string())
}

// x-ratelimit-reset wins, then retry-after, then a one minute guess.
// Out-of-range retry-after values fall back to the guess.
fn reset_time(headers: &HeaderMap, header_reset: Option<DateTime<Utc>>) -> DateTime<Utc> {
    if let Some(at) = header_reset {
        return at;
    }
    let now = Utc::now();
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(Duration::try_seconds)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or_else(|| now + Duration::seconds(60))
}

/// One failed check against a tool's input schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub code: String,
    pub expected: String,
    pub received: String,
    pub path: Vec<String>,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    GitHub(#[from] GitHubError),
    #[error("Repository must be in format 'owner/repo'")]
    RepositoryFormat,
    #[error("Invalid input: {}", serde_json::to_string(.0).unwrap_or_default())]
    InvalidInput(Vec<FieldViolation>),
    #[error("Arguments are required")]
    MissingArguments,
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid User-Agent header value: {0:?}")]
    InvalidUserAgent(String),
    #[error("request to GitHub failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected non-JSON response from {0}")]
    UnexpectedBody(String),
}

impl Error {
    /// True when the caller sent something malformed, as opposed to an upstream failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::RepositoryFormat | Error::InvalidInput(_) | Error::MissingArguments
        )
    }
}

/// Human-readable rendering used at the tool boundary.
pub fn describe_error(err: &Error) -> String {
    match err {
        Error::GitHub(e) => e.describe(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn json_body(msg: &str) -> ApiBody {
        ApiBody::Json(serde_json::json!({ "message": msg }))
    }

    #[test]
    fn status_classification_matrix() {
        let h = HeaderMap::new();
        let kind = |s: StatusCode| GitHubError::classify(s, &h, json_body("x")).kind;
        assert_eq!(kind(StatusCode::UNPROCESSABLE_ENTITY), GitHubErrorKind::Validation);
        assert_eq!(kind(StatusCode::NOT_FOUND), GitHubErrorKind::NotFound);
        assert_eq!(kind(StatusCode::UNAUTHORIZED), GitHubErrorKind::Authentication);
        assert_eq!(kind(StatusCode::FORBIDDEN), GitHubErrorKind::Permission);
        assert_eq!(kind(StatusCode::CONFLICT), GitHubErrorKind::Conflict);
        assert_eq!(kind(StatusCode::INTERNAL_SERVER_ERROR), GitHubErrorKind::Api);
        assert!(matches!(
            kind(StatusCode::TOO_MANY_REQUESTS),
            GitHubErrorKind::RateLimit { .. }
        ));
    }

    #[test]
    fn forbidden_with_exhausted_quota_is_rate_limit() {
        let mut h = HeaderMap::new();
        h.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        h.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        let err = GitHubError::classify(
            StatusCode::FORBIDDEN,
            &h,
            json_body("API rate limit exceeded"),
        );
        let reset = err.reset_at().expect("rate limit carries reset");
        assert_eq!(reset.timestamp(), 1_700_000_000);
        let text = err.describe();
        assert!(text.starts_with("Rate Limit Exceeded: API rate limit exceeded"));
        assert!(text.contains("Resets at: 2023-11-14T22:13:20.000Z"));
    }

    #[test]
    fn rate_limit_without_headers_defaults_to_a_minute() {
        let before = Utc::now();
        let err = GitHubError::classify(
            StatusCode::TOO_MANY_REQUESTS,
            &HeaderMap::new(),
            json_body("slow down"),
        );
        let reset = err.reset_at().unwrap();
        assert!(reset >= before + Duration::seconds(59));
    }

    #[test]
    fn secondary_limit_forbidden_with_retry_after_is_rate_limit() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        h.insert("x-ratelimit-remaining", HeaderValue::from_static("4000"));
        let before = Utc::now();
        let err = GitHubError::classify(
            StatusCode::FORBIDDEN,
            &h,
            json_body("You have exceeded a secondary rate limit"),
        );
        let reset = err.reset_at().expect("secondary limit is a rate limit");
        assert!(reset >= before + Duration::seconds(59));
        assert!(err
            .describe()
            .starts_with("Rate Limit Exceeded: You have exceeded a secondary rate limit"));
    }

    #[test]
    fn absurd_retry_after_falls_back_to_a_minute() {
        for value in ["10000000000000", "9223372036854775807", "-9223372036854775808"] {
            let mut h = HeaderMap::new();
            h.insert(RETRY_AFTER, HeaderValue::from_static(value));
            let before = Utc::now();
            let err =
                GitHubError::classify(StatusCode::TOO_MANY_REQUESTS, &h, json_body("slow down"));
            let reset = err.reset_at().unwrap();
            assert!(reset >= before + Duration::seconds(59), "retry-after {value}");
            assert!(reset <= Utc::now() + Duration::seconds(61), "retry-after {value}");
        }
    }

    #[test]
    fn message_falls_back_to_text_then_generic() {
        let h = HeaderMap::new();
        let text_body = ApiBody::Text("upstream down".into());
        let e = GitHubError::classify(StatusCode::BAD_GATEWAY, &h, text_body);
        assert_eq!(e.message, "upstream down");
        assert_eq!(e.describe(), "GitHub API Error: upstream down");
        let empty_body = ApiBody::Json(serde_json::json!({}));
        let e = GitHubError::classify(StatusCode::BAD_GATEWAY, &h, empty_body);
        assert_eq!(e.message, "GitHub API error");
    }

    #[test]
    fn validation_error_includes_details() {
        let body = ApiBody::Json(serde_json::json!({
            "message": "Validation Failed",
            "errors": [{"field": "tag"}]
        }));
        let e = GitHubError::classify(StatusCode::UNPROCESSABLE_ENTITY, &HeaderMap::new(), body);
        let text = e.describe();
        assert!(text.starts_with("Validation Error: Validation Failed\nDetails: "));
        assert!(text.contains("\"field\":\"tag\""));
    }

    #[test]
    fn input_errors_keep_their_message() {
        assert_eq!(
            describe_error(&Error::UnknownTool("nope".into())),
            "Unknown tool: nope"
        );
        assert_eq!(
            describe_error(&Error::RepositoryFormat),
            "Repository must be in format 'owner/repo'"
        );
        assert!(Error::MissingArguments.is_input_error());
        assert!(!Error::UnknownTool("x".into()).is_input_error());
    }
}
