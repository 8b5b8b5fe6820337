use crate::config::Config;
use crate::error::{Error, GitHubError};
use crate::types::{ApiBody, RateMeta};
use log::{debug, warn};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const API_VERSION_HEADER: &str = "x-github-api-version";

/// Per-request knobs; the default is a bare GET.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
        }
    }
}

pub fn build_client(cfg: &Config) -> Result<Client, Error> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .map_err(|_| Error::InvalidUserAgent(cfg.user_agent.clone()))?;
    default_headers.insert(USER_AGENT, ua);
    // User-Agent lives only here.
    // Authorization is attached per request so the default headers never hold the token.
    let mut builder = Client::builder()
        .default_headers(default_headers)
        .use_rustls_tls();
    if let Some(secs) = cfg.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

fn base_headers(cfg: &Config) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(v) = HeaderValue::from_str(&cfg.api_version) {
        headers.insert(HeaderName::from_static(API_VERSION_HEADER), v);
    }
    if let Some(token) = cfg.token.as_deref() {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut v) => {
                v.set_sensitive(true);
                headers.insert(AUTHORIZATION, v);
            }
            Err(_) => {
                warn!("GitHub token contains invalid header characters; sending unauthenticated")
            }
        }
    }
    headers
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let num = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
    };
    RateMeta {
        limit: num("x-ratelimit-limit"),
        remaining: num("x-ratelimit-remaining"),
        used: num("x-ratelimit-used"),
        reset_at: num("x-ratelimit-reset")
            .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0)),
    }
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false)
}

fn parse_body(headers: &HeaderMap, text: String) -> Result<ApiBody, serde_json::Error> {
    if is_json_content(headers) {
        serde_json::from_str(&text).map(ApiBody::Json)
    } else {
        Ok(ApiBody::Text(text))
    }
}

/// Issue one request against the GitHub REST API.
///
/// `path` is relative to `cfg.api_url`. Non-2xx responses come back as
/// [`Error::GitHub`] classified by status and rate-limit headers.
pub async fn rest_request(
    client: &Client,
    cfg: &Config,
    path: &str,
    options: RequestOptions,
) -> Result<ApiBody, Error> {
    let url = format!("{}{}", cfg.api_url, path);
    let mut headers = base_headers(cfg);
    headers.extend(options.headers);

    debug!("GitHub {} {}", options.method, url);
    let mut req = client.request(options.method, &url).headers(headers);
    if let Some(body) = options.body.as_ref() {
        req = req.body(serde_json::to_vec(body)?);
    }
    let res = req.send().await.map_err(|e| {
        warn!("GitHub request to {} failed: {}", url, e);
        Error::Transport(e)
    })?;

    let status = res.status();
    let resp_headers = res.headers().clone();
    let text = res.text().await?;

    if status.is_success() {
        return Ok(parse_body(&resp_headers, text)?);
    }

    // Error bodies are informational; keep the raw text if the JSON is broken.
    let body = parse_body(&resp_headers, text.clone()).unwrap_or(ApiBody::Text(text));
    let err = GitHubError::classify(status, &resp_headers, body);
    warn!("GitHub {} returned {}: {}", url, status, err.message);
    Err(err.into())
}

/// GET `path` and deserialize its JSON body into `T`.
pub async fn rest_get_json<T: DeserializeOwned>(
    client: &Client,
    cfg: &Config,
    path: &str,
) -> Result<T, Error> {
    match rest_request(client, cfg, path, RequestOptions::default()).await? {
        ApiBody::Json(v) => Ok(serde_json::from_value(v)?),
        ApiBody::Text(_) => Err(Error::UnexpectedBody(path.to_string())),
    }
}

/// Percent-encode a single URL path segment.
pub fn encode_path_segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Encode a git ref name segment by segment, keeping its slashes.
pub fn encode_ref_path(s: &str) -> String {
    s.split('/')
        .map(encode_path_segment)
        .collect::<Vec<_>>()
        .join("/")
}
