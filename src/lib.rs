use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    config::Config,
    output::OutputSink,
    payload::IssuePayload,
    progress::{Phase, ProgressReporter, Summary},
    schema::SchemaDocument,
    table::TableName,
};

pub mod config;
pub mod github;
pub mod output;
pub mod payload;
pub mod progress;
pub mod schema;
pub mod table;

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to fetch issue: {0}")]
    RemoteFetch(#[from] github::Error),
    #[error("Malformed issue body: {0}")]
    MalformedPayload(#[from] payload::Error),
    #[error(transparent)]
    InvalidTableName(#[from] table::Error),
    #[error("Schema file not found at: {}", .0.display())]
    SchemaNotFound(PathBuf),
    #[error(transparent)]
    Schema(#[from] schema::Error),
    #[error(transparent)]
    Output(#[from] output::Error),
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub table_name: String,
    pub branch_suffix: String,
    pub schema_path: PathBuf,
    pub updated_count: usize,
    pub total_fields: usize,
}

/// Apply the descriptions in an issue body to the matching `schema.yaml`.
pub async fn run(config: &Config, reporter: &dyn ProgressReporter) -> Result<UpdateReport, Error> {
    reporter.log_info(&format!("Processing issue #{}...", config.issue_number));
    reporter.set_phase(Phase::FetchingIssue);
    let client = github::Client::new(config.api_url.clone(), config.token.clone())?;
    let body = client
        .issue_body(&config.repo, config.issue_number)
        .await?;
    reporter.step_done(&format!("Fetched issue #{}", config.issue_number));

    sync_body(config, &body, reporter).await
}

/// Everything after the fetch: parse, locate, merge, save, report.
pub async fn sync_body(
    config: &Config,
    body: &str,
    reporter: &dyn ProgressReporter,
) -> Result<UpdateReport, Error> {
    reporter.set_phase(Phase::ParsingPayload);
    let payload = IssuePayload::parse(body)?;
    reporter.step_done(&format!("Parsed table: {}", payload.table));
    reporter.step_done(&format!(
        "Found {} column descriptions",
        payload.descriptions.len()
    ));

    reporter.set_phase(Phase::LocatingSchema);
    let table: TableName = payload.table.parse()?;
    let schema_path = config.root.join(table.schema_path());
    if !tokio::fs::try_exists(&schema_path).await.unwrap_or(false) {
        return Err(Error::SchemaNotFound(schema_path));
    }
    reporter.step_done(&format!("Found schema at: {}", schema_path.display()));

    reporter.set_phase(Phase::LoadingSchema);
    let mut schema = SchemaDocument::load(&schema_path).await?;
    reporter.step_done(&format!(
        "Loaded schema with {} columns",
        schema.field_count()
    ));

    reporter.set_phase(Phase::UpdatingDescriptions);
    let result = schema.apply_descriptions(&payload.descriptions)?;
    for column in &result.unmatched {
        warn!(%column, table = %payload.table, "no field matches column");
        reporter.log_warn(&format!("No field named {column} in {}", payload.table));
    }
    reporter.step_done(&format!(
        "Updated {} column descriptions",
        result.updated_count
    ));

    reporter.set_phase(Phase::SavingSchema);
    schema.save().await?;
    reporter.step_done(&format!(
        "Saved updated schema to {}",
        schema_path.display()
    ));

    reporter.set_phase(Phase::WritingOutputs);
    let branch_suffix = table.branch_suffix(Utc::now());
    let columns_updated = result.updated_count.to_string();
    let sink = OutputSink::new(config.github_output.clone());
    sink.write_all(&[
        ("table_name", payload.table.as_str()),
        ("branch_suffix", branch_suffix.as_str()),
        ("columns_updated", columns_updated.as_str()),
    ])
    .await?;
    if sink.is_enabled() {
        reporter.step_done("Wrote step outputs");
    }

    info!(
        table = %payload.table,
        updated = result.updated_count,
        total = result.total_fields,
        "schema updated"
    );
    reporter.finish(&Summary {
        table_name: payload.table.clone(),
        updated_count: result.updated_count,
        total_fields: result.total_fields,
    });

    Ok(UpdateReport {
        table_name: payload.table,
        branch_suffix,
        schema_path,
        updated_count: result.updated_count,
        total_fields: result.total_fields,
    })
}
