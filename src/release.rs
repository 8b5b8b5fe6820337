//! GitHub release lookups, reduced to the fields a workflow author needs.

use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::http::{self, encode_ref_path};
use crate::repository::{parse_repository, RepoInput, RepoRef};

/// The subset of a GitHub release object we read.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    pub html_url: String,
    pub target_commitish: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
}

// Only `object.sha` of a git ref is needed.
#[derive(Debug, Clone, Deserialize)]
pub struct GitReference {
    pub object: GitObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedRelease {
    pub tag_name: String,
    pub name: String,
    pub sha: String,
    pub published_at: Option<String>,
    pub html_url: String,
    pub target_commitish: String,
    pub prerelease: bool,
    pub draft: bool,
}

impl SimplifiedRelease {
    fn from_raw(raw: RawRelease, sha: String) -> Self {
        let name = raw
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| raw.tag_name.clone());
        Self {
            tag_name: raw.tag_name,
            name,
            sha,
            published_at: raw.published_at,
            html_url: raw.html_url,
            target_commitish: raw.target_commitish,
            prerelease: raw.prerelease,
            draft: raw.draft,
        }
    }
}

/// Reduce `raw` to its simplified shape; with `resolve_sha` the tag is
/// looked up to fill in the commit SHA (one extra request).
pub async fn simplify_release(
    client: &Client,
    cfg: &Config,
    repo: &RepoRef,
    raw: RawRelease,
    resolve_sha: bool,
) -> Result<SimplifiedRelease, Error> {
    let sha = if resolve_sha {
        let path = format!(
            "{}/git/refs/tags/{}",
            repo.api_path(),
            encode_ref_path(&raw.tag_name)
        );
        let reference: GitReference = http::rest_get_json(client, cfg, &path).await?;
        reference.object.sha
    } else {
        String::new()
    };
    Ok(SimplifiedRelease::from_raw(raw, sha))
}

/// All releases of a repository, newest first as GitHub returns them.
pub async fn list_releases(
    client: &Client,
    cfg: &Config,
    input: &RepoInput,
) -> Result<Vec<SimplifiedRelease>, Error> {
    let repo = parse_repository(input)?;
    let path = format!("{}/releases", repo.api_path());
    let releases: Vec<RawRelease> = http::rest_get_json(client, cfg, &path).await?;
    // try_join_all yields results in submission order.
    try_join_all(
        releases
            .into_iter()
            .map(|raw| simplify_release(client, cfg, &repo, raw, false)),
    )
    .await
}

/// The latest non-prerelease, non-draft release with its tag's commit SHA.
pub async fn get_latest_release(
    client: &Client,
    cfg: &Config,
    input: &RepoInput,
) -> Result<SimplifiedRelease, Error> {
    let repo = parse_repository(input)?;
    let path = format!("{}/releases/latest", repo.api_path());
    let release: RawRelease = http::rest_get_json(client, cfg, &path).await?;
    simplify_release(client, cfg, &repo, release, true).await
}
