use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use schema_issue_sync::{config::Config, github, progress};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Update column descriptions in a schema.yaml from a GitHub issue.
#[derive(Parser)]
#[clap(version, about)]
struct Opts {
    /// Issue carrying the JSON payload.
    #[clap(long, value_parser = clap::value_parser!(u64).range(1..))]
    issue_number: u64,
    /// Repository in the form owner/name.
    #[clap(long, env = "GITHUB_REPOSITORY")]
    repo: github::Repository,
    /// Token used to read the issue.
    #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,
    #[clap(long, env = "GITHUB_API_URL", default_value = github::DEFAULT_API_URL)]
    api_url: url::Url,
    /// Directory containing `sql/`.
    #[clap(long, default_value = ".")]
    root: PathBuf,
    /// File receiving step outputs as key=value lines.
    #[clap(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,
}

impl Opts {
    fn into_config(self) -> anyhow::Result<Config> {
        anyhow::ensure!(!self.token.trim().is_empty(), "token must not be empty");
        Ok(Config {
            repo: self.repo,
            issue_number: self.issue_number,
            token: self.token,
            api_url: self.api_url,
            root: self.root,
            github_output: self.github_output.filter(|path| !path.as_os_str().is_empty()),
        })
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let reporter = progress::create_reporter();
    let config = match opts.into_config() {
        Ok(config) => config,
        Err(e) => {
            reporter.log_error(&format!("Error: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start runtime")
        .and_then(|runtime| {
            runtime
                .block_on(schema_issue_sync::run(&config, reporter.as_ref()))
                .map_err(anyhow::Error::from)
        });
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(?e, "critical error");
            reporter.log_error(&format!("Error: {e}"));
            ExitCode::FAILURE
        }
    }
}
