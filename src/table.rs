//! Fully qualified table names and the schema files they point at.

use std::{fmt, path::PathBuf, str::FromStr};

use chrono::{DateTime, Utc};

pub const SCHEMA_FILE_NAME: &str = "schema.yaml";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid table name format: {name} (expected format: database.dataset.table)")]
pub struct Error {
    pub name: String,
}

/// `database.dataset.table`, split into its three segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub database: String,
    pub dataset: String,
    pub table: String,
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error { name: s.to_owned() };
        let mut parts = s.split('.');
        let (Some(database), Some(dataset), Some(table), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if [database, dataset, table].iter().any(|part| part.is_empty()) {
            return Err(invalid());
        }
        Ok(Self {
            database: database.to_owned(),
            dataset: dataset.to_owned(),
            table: table.to_owned(),
        })
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.dataset, self.table)
    }
}

impl TableName {
    /// `sql/<database>/<dataset>/<table>/schema.yaml`, relative to the checkout root.
    pub fn schema_path(&self) -> PathBuf {
        ["sql", &self.database, &self.dataset, &self.table, SCHEMA_FILE_NAME]
            .iter()
            .collect()
    }

    pub fn branch_suffix(&self, at: DateTime<Utc>) -> String {
        format!(
            "{}-{}-{}-{}",
            self.database,
            self.dataset,
            self.table,
            at.format("%Y%m%d%H%M%S")
        )
    }
}
