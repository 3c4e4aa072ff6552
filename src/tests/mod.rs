use std::{path::Path, sync::Mutex};

use crate::{
    Error,
    config::Config,
    progress::{NullReporter, Phase, ProgressReporter, Summary},
    run, sync_body,
};

const CLICKS_SCHEMA: &str = include_str!("fixtures/sql/analytics/events/clicks/schema.yaml");
const CLICKS_PATH: &str = "sql/analytics/events/clicks/schema.yaml";

const SCENARIO_BODY: &str = r#"{"table":"analytics.events.clicks","descriptions":{"user_id":"Unique user identifier","event_ts":"Event timestamp (UTC)"}}"#;

/// Records everything it is told.
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressReporter for RecordingReporter {
    fn log_info(&self, message: &str) {
        self.push(format!("info {message}"));
    }
    fn set_phase(&self, phase: Phase) {
        self.push(format!("phase {phase:?}"));
    }
    fn step_done(&self, message: &str) {
        self.push(format!("✓ {message}"));
    }
    fn log_warn(&self, message: &str) {
        self.push(format!("warn {message}"));
    }
    fn log_error(&self, message: &str) {
        self.push(format!("✗ {message}"));
    }
    fn finish(&self, summary: &Summary) {
        self.push(format!(
            "done {}/{}",
            summary.updated_count, summary.total_fields
        ));
    }
}

/// A checkout containing the clicks schema.
fn checkout() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CLICKS_PATH);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, CLICKS_SCHEMA).unwrap();
    dir
}

fn config(api_url: &str, root: &Path) -> Config {
    Config {
        repo: "acme/warehouse".parse().unwrap(),
        issue_number: 17,
        token: "secret".into(),
        api_url: api_url.parse().unwrap(),
        root: root.to_owned(),
        github_output: Some(root.join("github_output")),
    }
}

fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).unwrap()
}

async fn issue_server(status: usize, body: &str) -> (mockito::ServerGuard, mockito::Mock) {
    let mut server = mockito::Server::new_async().await;
    let response = serde_json::json!({ "number": 17, "body": body });
    let mock = server
        .mock("GET", "/repos/acme/warehouse/issues/17")
        .match_header("authorization", "Bearer secret")
        .with_status(status)
        .with_body(response.to_string())
        .create_async()
        .await;
    (server, mock)
}

#[tokio::test]
async fn test_clicks_scenario() {
    let dir = checkout();
    let (server, _mock) = issue_server(200, SCENARIO_BODY).await;
    let config = config(&server.url(), dir.path());
    let reporter = RecordingReporter::default();

    let report = run(&config, &reporter).await.unwrap();
    assert_eq!(report.table_name, "analytics.events.clicks");
    assert_eq!(report.updated_count, 2);
    assert_eq!(report.total_fields, 3);
    assert_eq!(report.schema_path, dir.path().join(CLICKS_PATH));

    let expected = CLICKS_SCHEMA
        .replacen(
            "    description: \"\"\n",
            "    description: \"Unique user identifier\"\n",
            1,
        )
        .replacen(
            "    description: ''\n",
            "    description: 'Event timestamp (UTC)'\n",
            1,
        );
    assert_eq!(read(dir.path(), CLICKS_PATH), expected);
    // session_id keeps its empty description
    assert!(expected.contains("  - name: session_id\n    type: STRING\n    description: \"\"\n"));

    let outputs = read(dir.path(), "github_output");
    let lines: Vec<&str> = outputs.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "table_name=analytics.events.clicks");
    let suffix = regex::Regex::new(r"^branch_suffix=analytics-events-clicks-\d{14}$").unwrap();
    assert!(suffix.is_match(lines[1]), "{}", lines[1]);
    assert_eq!(lines[2], "columns_updated=2");
    assert_eq!(
        report.branch_suffix,
        lines[1].trim_start_matches("branch_suffix=")
    );

    let events = reporter.events();
    assert_eq!(events[0], "info Processing issue #17...");
    assert!(events.contains(&"✓ Fetched issue #17".to_string()));
    assert!(events.contains(&"✓ Parsed table: analytics.events.clicks".to_string()));
    assert!(events.contains(&"✓ Found 2 column descriptions".to_string()));
    assert!(events.contains(&"✓ Loaded schema with 3 columns".to_string()));
    assert!(events.contains(&"✓ Updated 2 column descriptions".to_string()));
    assert_eq!(events.last().unwrap(), "done 2/3");
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = checkout();
    let config = config("http://127.0.0.1:9", dir.path());

    sync_body(&config, SCENARIO_BODY, &NullReporter).await.unwrap();
    let once = read(dir.path(), CLICKS_PATH);
    let report = sync_body(&config, SCENARIO_BODY, &NullReporter).await.unwrap();
    assert_eq!(report.updated_count, 2);
    assert_eq!(read(dir.path(), CLICKS_PATH), once);
}

#[tokio::test]
async fn test_empty_descriptions_round_trip() {
    let dir = checkout();
    let config = config("http://127.0.0.1:9", dir.path());
    let body = r#"{"table": "analytics.events.clicks", "descriptions": {}}"#;

    let report = sync_body(&config, body, &NullReporter).await.unwrap();
    assert_eq!(report.updated_count, 0);
    assert_eq!(read(dir.path(), CLICKS_PATH), CLICKS_SCHEMA);
    assert!(read(dir.path(), "github_output").ends_with("columns_updated=0\n"));
}

#[tokio::test]
async fn test_malformed_body_writes_nothing() {
    let dir = checkout();
    let (server, _mock) = issue_server(200, "Please describe user_id as the user key").await;
    let config = config(&server.url(), dir.path());

    let err = run(&config, &NullReporter).await.unwrap_err();
    assert!(matches!(err, Error::MalformedPayload(_)), "{err}");
    assert_eq!(read(dir.path(), CLICKS_PATH), CLICKS_SCHEMA);
    assert!(!dir.path().join("github_output").exists());
}

#[tokio::test]
async fn test_fenced_body_is_malformed() {
    let dir = checkout();
    let body = format!("```json\n{SCENARIO_BODY}\n```");
    let (server, _mock) = issue_server(200, &body).await;
    let config = config(&server.url(), dir.path());

    let err = run(&config, &NullReporter).await.unwrap_err();
    assert!(matches!(err, Error::MalformedPayload(_)), "{err}");
    assert_eq!(read(dir.path(), CLICKS_PATH), CLICKS_SCHEMA);
    assert!(!dir.path().join("github_output").exists());
}

#[tokio::test]
async fn test_missing_keys_are_distinct_errors() {
    let dir = checkout();
    let config = config("http://127.0.0.1:9", dir.path());

    let err = sync_body(&config, r#"{"descriptions": {}}"#, &NullReporter)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Malformed issue body: Missing 'table' field in JSON");
    let err = sync_body(&config, r#"{"table": "a.b.c"}"#, &NullReporter)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Malformed issue body: Missing 'descriptions' field in JSON"
    );
}

#[tokio::test]
async fn test_invalid_table_name_before_file_access() {
    // the root does not exist, so any file access would surface as a missing schema
    let dir = tempfile::tempdir().unwrap();
    let config = config("http://127.0.0.1:9", &dir.path().join("no-checkout"));
    let body = r#"{"table": "analytics.clicks", "descriptions": {"user_id": "x"}}"#;

    let err = sync_body(&config, body, &NullReporter).await.unwrap_err();
    match err {
        Error::InvalidTableName(e) => assert_eq!(e.name, "analytics.clicks"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_schema() {
    let dir = checkout();
    let config = config("http://127.0.0.1:9", dir.path());
    let body = r#"{"table": "analytics.events.views", "descriptions": {"user_id": "x"}}"#;

    let err = sync_body(&config, body, &NullReporter).await.unwrap_err();
    match err {
        Error::SchemaNotFound(path) => {
            assert_eq!(
                path,
                dir.path().join("sql/analytics/events/views/schema.yaml")
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("github_output").exists());
}

#[tokio::test]
async fn test_unmatched_columns_are_warned() {
    let dir = checkout();
    let config = config("http://127.0.0.1:9", dir.path());
    let body = r#"{"table": "analytics.events.clicks", "descriptions": {"user_id": "x", "country": "y"}}"#;
    let reporter = RecordingReporter::default();

    let report = sync_body(&config, body, &reporter).await.unwrap();
    assert_eq!(report.updated_count, 1);
    assert!(
        reporter
            .events()
            .contains(&"warn No field named country in analytics.events.clicks".to_string())
    );
}

#[tokio::test]
async fn test_remote_failure() {
    let dir = checkout();
    let (server, _mock) = issue_server(403, "").await;
    let config = config(&server.url(), dir.path());

    let err = run(&config, &NullReporter).await.unwrap_err();
    assert!(matches!(err, Error::RemoteFetch(_)), "{err}");
    assert_eq!(read(dir.path(), CLICKS_PATH), CLICKS_SCHEMA);
}

#[tokio::test]
async fn test_without_output_file() {
    let dir = checkout();
    let mut config = config("http://127.0.0.1:9", dir.path());
    config.github_output = None;

    let report = sync_body(&config, SCENARIO_BODY, &NullReporter).await.unwrap();
    assert_eq!(report.updated_count, 2);
    assert!(!dir.path().join("github_output").exists());
}
