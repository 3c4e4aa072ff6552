//! Minimal GitHub REST client: reads the body of a single issue.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("status: {code}, body: {body}")]
    Status {
        code: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode issue response: {0}")]
    Decode(serde_json::Error),
    #[error("API URL cannot be a base: {0}")]
    InvalidApiUrl(url::Url),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid repository: {0} (expected format: owner/name)")]
pub struct InvalidRepository(String);

/// `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl FromStr for Repository {
    type Err = InvalidRepository;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                })
            }
            _ => Err(InvalidRepository(s.to_owned())),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Deserialize)]
struct Issue {
    #[serde(default)]
    body: Option<String>,
}

pub struct Client {
    api_url: url::Url,
    token: String,
    client: reqwest::Client,
}

impl Client {
    pub fn new(api_url: url::Url, token: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)?;
        Ok(Self {
            api_url,
            token: token.into(),
            client,
        })
    }

    fn issue_url(&self, repo: &Repository, number: u64) -> Result<url::Url, Error> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidApiUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend([
                "repos",
                repo.owner.as_str(),
                repo.name.as_str(),
                "issues",
                number.to_string().as_str(),
            ]);
        Ok(url)
    }

    /// Body of issue `number`; an issue without a body yields an empty string.
    pub async fn issue_body(&self, repo: &Repository, number: u64) -> Result<String, Error> {
        let endpoint = self.issue_url(repo, number)?;
        debug!(%endpoint, "fetching issue");
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(Error::Transport)?;

        let code = response.status();
        let body = response.text().await.map_err(Error::Transport)?;
        if !code.is_success() {
            return Err(Error::Status { code, body });
        }
        let issue: Issue = serde_json::from_str(&body).map_err(Error::Decode)?;
        Ok(issue.body.unwrap_or_default())
    }
}
