use std::env;

use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Runtime configuration for the GitHub REST client.
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            api_version: "2022-11-28".to_string(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_PERSONAL_ACCESS_TOKEN (or GITHUB_TOKEN, GH_TOKEN) [optional]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: no timeout)
    /// - GITHUB_USER_AGENT (default: tgrall/mcp-github-actions-version/v<version> (<os>; <arch>))
    pub fn from_env() -> Result<Self, String> {
        let token = ["GITHUB_PERSONAL_ACCESS_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"]
            .iter()
            .find_map(|key| non_empty_var(key));

        let api_url = non_empty_var("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let api_url = validate_api_url(&api_url)?;

        let defaults = Self::default();
        let api_version = non_empty_var("GITHUB_API_VERSION").unwrap_or(defaults.api_version);
        let timeout_secs = non_empty_var("GITHUB_HTTP_TIMEOUT_SECS")
            .map(|s| {
                s.parse::<u64>()
                    .map_err(|_| format!("Invalid GITHUB_HTTP_TIMEOUT_SECS: {}", s))
            })
            .transpose()?;
        let user_agent = non_empty_var("GITHUB_USER_AGENT").unwrap_or(defaults.user_agent);

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn validate_api_url(raw: &str) -> Result<String, String> {
    let parsed = Url::parse(raw).map_err(|e| format!("Invalid GITHUB_API_URL '{}': {}", raw, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(format!(
            "Invalid GITHUB_API_URL '{}': unsupported scheme {}",
            raw, other
        )),
    }
}

pub fn default_user_agent() -> String {
    format!(
        "tgrall/mcp-github-actions-version/v{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        env::consts::OS,
        env::consts::ARCH
    )
}
