mod common;

use askdb::db::demo::DemoConnector;
use askdb::db::{Connectors, DatabaseKind};
use askdb::session::store::CredentialStore;
use askdb::session::ConnectRequest;
use askdb::AppError;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn chinook(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("source.sqlite");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Customer (CustomerId INTEGER PRIMARY KEY, FirstName TEXT, Country TEXT);
         INSERT INTO Customer VALUES (1, 'Luís', 'Brazil');
         INSERT INTO Customer VALUES (2, 'Leonie', 'Germany');
         INSERT INTO Customer VALUES (3, 'François', 'Canada');",
    )
    .unwrap();
    path
}

#[tokio::test]
async fn demo_question_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let demo = DemoConnector::new(
        format!("file://{}", chinook(dir.path()).display()),
        dir.path().join("cache").join("Chinook.sqlite"),
    );
    let unused = FakeConnector::failing(FakeExecutor::returning(count_table(0)));
    let connectors = Connectors::uniform(unused.clone()).with(DatabaseKind::Demo, Arc::new(demo));
    let mut session = session_with(connectors, &dir.path().join("saved_data.json"));

    session.select(DatabaseKind::Demo);
    let warning = session.connect(ConnectRequest::default()).await.unwrap();
    assert_eq!(warning, None);
    assert_eq!(unused.calls(), 0);

    let translator = FakeTranslator::new(
        "SELECT COUNT(*) AS customers FROM Customer",
        Some(r#"{"mark": "bar", "encoding": {"y": {"field": "customers", "type": "quantitative"}}}"#),
    );
    let pipeline = pipeline_with(translator.clone());

    let outcome = pipeline
        .process(&mut session, "How many customers are there?")
        .await
        .unwrap();

    assert!(outcome.sql.to_uppercase().contains("COUNT"));
    assert_eq!(outcome.table.columns, vec!["customers"]);
    assert_eq!(outcome.table.rows, vec![vec![json!(3)]]);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].question, "How many customers are there?");

    let chart = outcome.chart.unwrap();
    assert_eq!(chart.0["data"]["values"], json!([{"customers": 3}]));

    let csv = session.last_result().unwrap().to_csv().unwrap();
    assert_eq!(String::from_utf8(csv).unwrap(), "customers\n3\n");
    assert!(session.favorites().is_empty());
}

#[tokio::test]
async fn chart_failure_still_returns_results() {
    let dir = tempfile::tempdir().unwrap();
    let executor = FakeExecutor::returning(count_table(59));
    let connector = FakeConnector::new(executor.clone());
    let mut session = session_with(Connectors::uniform(connector), &dir.path().join("s.json"));
    session.connect(mysql_form("", false)).await.unwrap();

    let translator = FakeTranslator::new("SELECT COUNT(*) FROM Customer", Some("fig = px.bar(df)"));
    let outcome = pipeline_with(translator.clone())
        .process(&mut session, "How many customers are there?")
        .await
        .unwrap();

    assert!(outcome.chart.is_none());
    assert_eq!(outcome.table.rows, vec![vec![json!(59)]]);
    assert_eq!(translator.chart_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(executor.statements(), vec!["SELECT COUNT(*) FROM Customer"]);
}

#[tokio::test]
async fn invalid_question_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let executor = FakeExecutor::returning(count_table(1));
    let mut session = session_with(
        Connectors::uniform(FakeConnector::new(executor.clone())),
        &dir.path().join("s.json"),
    );
    session.connect(mysql_form("", false)).await.unwrap();

    let translator = FakeTranslator::new("SELECT 1", None);
    let pipeline = pipeline_with(translator.clone());

    for question in ["Robert'); DROP TABLE Customer; --", "count /* all */ rows", "   "] {
        let err = pipeline.process(&mut session, question).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)), "{question}");
    }

    assert_eq!(translator.sql_calls(), 0);
    assert!(executor.statements().is_empty());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn asking_without_connection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let executor = FakeExecutor::returning(count_table(1));
    let mut session = session_with(
        Connectors::uniform(FakeConnector::new(executor)),
        &dir.path().join("s.json"),
    );

    let translator = FakeTranslator::new("SELECT 1", None);
    let err = pipeline_with(translator.clone())
        .process(&mut session, "How many customers are there?")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotConnected));
    assert_eq!(translator.sql_calls(), 0);
}

#[tokio::test]
async fn execution_error_is_reported_without_history() {
    let dir = tempfile::tempdir().unwrap();
    let executor = FakeExecutor::returning(count_table(1));
    let mut session = session_with(
        Connectors::uniform(FakeConnector::new(executor)),
        &dir.path().join("s.json"),
    );
    session.connect(mysql_form("", false)).await.unwrap();

    let translator = FakeTranslator::new("SELECT * FROM missing_table", None);
    let err = pipeline_with(translator)
        .process(&mut session, "Show the missing table")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Execution(_)));
    assert!(err.to_string().contains("doesn't exist"));
    assert!(session.history().is_empty());
    assert!(session.last_result().is_none());
}

#[tokio::test]
async fn saved_profile_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("saved_data.json");
    let connector = FakeConnector::new(FakeExecutor::returning(count_table(1)));

    let mut session = session_with(Connectors::uniform(connector.clone()), &state_file);
    assert_eq!(session.connect(mysql_form("prod", true)).await.unwrap(), None);
    session.disconnect();

    let reloaded = CredentialStore::new(&state_file).load().unwrap();
    assert_eq!(reloaded.saved_connections.len(), 1);
    assert_eq!(reloaded.saved_connections[0].name.as_deref(), Some("prod"));
    assert_eq!(reloaded.saved_connections[0].port, 3306);

    let mut session = session_with(Connectors::uniform(connector.clone()), &state_file);
    session.connect_saved(0).await.unwrap();
    assert_eq!(session.saved_connections().len(), 1);
    assert_eq!(session.status().selected, DatabaseKind::MySql);

    let last = connector.profiles.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.password, "hunter2");

    let err = session.connect_saved(5).await.unwrap_err();
    assert!(matches!(err, AppError::IndexOutOfRange { index: 5, .. }));
}

#[tokio::test]
async fn unnamed_or_unchecked_profiles_are_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("saved_data.json");
    let connector = FakeConnector::new(FakeExecutor::returning(count_table(1)));
    let mut session = session_with(Connectors::uniform(connector), &state_file);

    session.connect(mysql_form("  ", true)).await.unwrap();
    session.disconnect();
    session.connect(mysql_form("prod", false)).await.unwrap();

    assert!(session.saved_connections().is_empty());
    assert!(!state_file.exists());
}

#[tokio::test]
async fn incomplete_form_never_dispatches() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(FakeExecutor::returning(count_table(1)));
    let mut session = session_with(Connectors::uniform(connector.clone()), &dir.path().join("s.json"));

    let mut form = mysql_form("prod", true);
    form.password = String::new();
    let err = session.connect(form).await.unwrap_err();

    assert_eq!(err.to_string(), "Please fill in all required fields");
    assert_eq!(connector.calls(), 0);
    assert_eq!(session.status().failed_attempts, 0);
}

#[tokio::test]
async fn favorites_round_trip_and_double_removal() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("saved_data.json");
    let connector = FakeConnector::new(FakeExecutor::returning(count_table(1)));
    let mut session = session_with(Connectors::uniform(connector.clone()), &state_file);

    assert_eq!(session.add_favorite("Top 5 artists by sales").unwrap(), None);
    assert_eq!(session.add_favorite("Customers per country").unwrap(), None);

    let reloaded = CredentialStore::new(&state_file).load().unwrap();
    let questions: Vec<&str> = reloaded.favorites.iter().map(|f| f.question.as_str()).collect();
    assert_eq!(questions, vec!["Top 5 artists by sales", "Customers per country"]);

    assert_eq!(session.reuse_favorite(1).unwrap(), "Customers per country");
    assert_eq!(session.prefill(), Some("Customers per country"));

    session.remove_favorite(1).unwrap();
    let err = session.remove_favorite(1).unwrap_err();
    assert!(matches!(err, AppError::IndexOutOfRange { what: "favorite", index: 1 }));

    let reloaded = session_with(Connectors::uniform(connector), &state_file);
    assert_eq!(reloaded.favorites().len(), 1);
    assert_eq!(reloaded.favorites()[0].question, "Top 5 artists by sales");
}

#[tokio::test]
async fn malformed_state_file_starts_empty_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("saved_data.json");
    std::fs::write(&state_file, "{\"favorites\": [").unwrap();

    let connector = FakeConnector::new(FakeExecutor::returning(count_table(1)));
    let session = session_with(Connectors::uniform(connector), &state_file);

    assert!(session.favorites().is_empty());
    assert!(session.load_warning().unwrap().contains("Invalid saved data"));
}

#[tokio::test]
async fn rejected_connect_leaves_selection_alone() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(FakeExecutor::returning(count_table(1)));
    let mut session = session_with(Connectors::uniform(connector.clone()), &dir.path().join("s.json"));

    session.connect(ConnectRequest::default()).await.unwrap();
    assert_eq!(session.status().selected, DatabaseKind::Demo);

    let err = session.connect(mysql_form("", false)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let status = session.status();
    assert_eq!(status.selected, DatabaseKind::Demo);
    assert_eq!(status.connection.unwrap().kind, DatabaseKind::Demo);
    assert_eq!(connector.calls(), 1);
}
