use serde::Deserialize;

use crate::error::Error;

/// Tool input naming a repository, either as `owner = "owner/repo"` or as
/// separate `owner` and `repository` fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoInput {
    pub owner: String,
    #[serde(default)]
    pub repository: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn api_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            crate::http::encode_path_segment(&self.owner),
            crate::http::encode_path_segment(&self.repo)
        )
    }
}

/// Normalize either input shape into an (owner, repo) pair.
///
/// Only the combined form is checked; split fields are taken verbatim.
pub fn parse_repository(input: &RepoInput) -> Result<RepoRef, Error> {
    match &input.repository {
        Some(repo) => Ok(RepoRef {
            owner: input.owner.clone(),
            repo: repo.clone(),
        }),
        None => match input.owner.split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(RepoRef {
                owner: (*owner).to_string(),
                repo: (*repo).to_string(),
            }),
            _ => Err(Error::RepositoryFormat),
        },
    }
}
