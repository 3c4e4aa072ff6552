use std::{fmt, path::PathBuf};

use crate::github::Repository;

/// Everything one run needs, resolved from the command line and environment.
#[derive(Clone)]
pub struct Config {
    pub repo: Repository,
    pub issue_number: u64,
    pub token: String,
    pub api_url: url::Url,
    /// Checkout root containing `sql/`.
    pub root: PathBuf,
    /// `$GITHUB_OUTPUT`, when set.
    pub github_output: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("repo", &self.repo)
            .field("issue_number", &self.issue_number)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .field("root", &self.root)
            .field("github_output", &self.github_output)
            .finish()
    }
}
