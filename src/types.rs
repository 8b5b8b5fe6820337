use chrono::{DateTime, Utc};
use serde_json::Value;

// Rate-limit state reported by the REST API on every response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateMeta {
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
    pub used: Option<i64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateMeta {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Parsed response body: JSON when the upstream declared a JSON content-type,
/// raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Text(String),
}

impl ApiBody {
    pub fn into_value(self) -> Value {
        match self {
            ApiBody::Json(v) => v,
            ApiBody::Text(s) => Value::String(s),
        }
    }
}
