//! JSON payload carried in an issue body.
//!
//! ```json
//! {"table": "analytics.events.clicks", "descriptions": {"user_id": "Unique user identifier"}}
//! ```
//!
//! The body must be exactly that object, apart from surrounding whitespace.

use indexmap::IndexMap;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid JSON in issue body: {0}")]
    InvalidJson(serde_json::Error),
    #[error("Issue body must be a JSON object, got {0}")]
    NotAnObject(serde_json::Value),
    #[error("Missing 'table' field in JSON")]
    MissingTable,
    #[error("Missing 'descriptions' field in JSON")]
    MissingDescriptions,
    #[error("Type mismatch for '{key}': expected {expected}, got {got}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        got: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePayload {
    /// Dotted `database.dataset.table`, as written in the issue.
    pub table: String,
    /// Column name to description, in issue order.
    pub descriptions: IndexMap<String, String>,
}

impl IssuePayload {
    pub fn parse(body: &str) -> Result<Self, Error> {
        let value: serde_json::Value =
            serde_json::from_str(body.trim()).map_err(Error::InvalidJson)?;
        let serde_json::Value::Object(mut object) = value else {
            return Err(Error::NotAnObject(value));
        };

        let table = match object.remove("table") {
            None => return Err(Error::MissingTable),
            Some(serde_json::Value::String(table)) => table,
            Some(got) => {
                return Err(Error::TypeMismatch {
                    key: "table".into(),
                    expected: "string",
                    got,
                });
            }
        };

        let descriptions = match object.remove("descriptions") {
            None => return Err(Error::MissingDescriptions),
            Some(serde_json::Value::Object(descriptions)) => descriptions,
            Some(got) => {
                return Err(Error::TypeMismatch {
                    key: "descriptions".into(),
                    expected: "object",
                    got,
                });
            }
        };
        let descriptions = descriptions
            .into_iter()
            .map(|(column, description)| match description {
                serde_json::Value::String(description) => Ok((column, description)),
                got => Err(Error::TypeMismatch {
                    key: format!("descriptions.{column}"),
                    expected: "string",
                    got,
                }),
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;

        Ok(Self {
            table,
            descriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, IssuePayload};

    #[test]
    fn test_parse_plain_json() {
        let payload = IssuePayload::parse(
            r#"{"table": "db.ds.tbl", "descriptions": {"col2": "desc2", "col1": "desc1"}}"#,
        )
        .unwrap();
        assert_eq!(payload.table, "db.ds.tbl");
        assert_eq!(
            payload.descriptions.iter().collect::<Vec<_>>(),
            vec![
                (&"col2".to_string(), &"desc2".to_string()),
                (&"col1".to_string(), &"desc1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let payload =
            IssuePayload::parse("\n\n  {\"table\": \"a.b.c\", \"descriptions\": {}}  \r\n").unwrap();
        assert_eq!(payload.table, "a.b.c");
        assert!(payload.descriptions.is_empty());
    }

    #[test]
    fn test_fenced_json_is_rejected() {
        let body = "```json\n{\"table\": \"a.b.c\", \"descriptions\": {\"x\": \"y\"}}\n```\n";
        assert!(matches!(
            IssuePayload::parse(body).unwrap_err(),
            Error::InvalidJson(_)
        ));
    }

    #[test]
    fn test_bare_fence_is_rejected() {
        let body = "```\r\n{\"table\": \"a.b.c\", \"descriptions\": {}}\r\n```";
        assert!(matches!(
            IssuePayload::parse(body).unwrap_err(),
            Error::InvalidJson(_)
        ));
    }

    #[test]
    fn test_invalid_json() {
        let err = IssuePayload::parse("please update user_id").unwrap_err();
        assert!(matches!(err, Error::InvalidJson(_)));
        assert!(err.to_string().starts_with("Invalid JSON in issue body"));
    }

    #[test]
    fn test_empty_body() {
        assert!(matches!(
            IssuePayload::parse("").unwrap_err(),
            Error::InvalidJson(_)
        ));
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            IssuePayload::parse("[1, 2]").unwrap_err(),
            Error::NotAnObject(_)
        ));
    }

    #[test]
    fn test_missing_table() {
        let err = IssuePayload::parse(r#"{"descriptions": {}}"#).unwrap_err();
        assert!(matches!(err, Error::MissingTable));
        assert_eq!(err.to_string(), "Missing 'table' field in JSON");
    }

    #[test]
    fn test_missing_descriptions() {
        let err = IssuePayload::parse(r#"{"table": "a.b.c"}"#).unwrap_err();
        assert!(matches!(err, Error::MissingDescriptions));
        assert_eq!(err.to_string(), "Missing 'descriptions' field in JSON");
    }

    #[test]
    fn test_table_must_be_string() {
        let err = IssuePayload::parse(r#"{"table": 3, "descriptions": {}}"#).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref key, .. } if key == "table"));
    }

    #[test]
    fn test_description_must_be_string() {
        let err =
            IssuePayload::parse(r#"{"table": "a.b.c", "descriptions": {"x": null}}"#).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref key, .. } if key == "descriptions.x"));
    }
}
