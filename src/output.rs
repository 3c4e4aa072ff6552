//! Step outputs for the surrounding workflow (`$GITHUB_OUTPUT`).

use std::path::PathBuf;

use tokio::io::AsyncWriteExt as _;

const DELIMITER: &str = "SCHEMA_ISSUE_SYNC_EOF";

#[derive(Debug, thiserror::Error)]
#[error("Failed to append outputs to {}: {source}", .path.display())]
pub struct Error {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Append-only `key=value` sink; does nothing when no path is configured.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    path: Option<PathBuf>,
}

fn format_output(name: &str, value: &str) -> String {
    if value.contains('\n') {
        format!("{name}<<{DELIMITER}\n{value}\n{DELIMITER}\n")
    } else {
        format!("{name}={value}\n")
    }
}

impl OutputSink {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Append all `outputs` in order with a single write.
    pub async fn write_all(&self, outputs: &[(&str, &str)]) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text: String = outputs
            .iter()
            .map(|(name, value)| format_output(name, value))
            .collect();
        let append = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(text.as_bytes()).await?;
            file.flush().await
        };
        append.await.map_err(|source| Error {
            path: path.clone(),
            source,
        })
    }
}
