//! Staleness integration tests: sync, edit, detect.

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use snowguard::catalog::{ObjectCategory, ObjectRef};
use snowguard::error::ErrorCode;
use snowguard::executor::MockExecutor;
use snowguard::repository::{StalenessChecker, SyncOptions, SyncOrchestrator};

use super::common::{exclusions, session, warehouse};

async fn synced_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(warehouse());
    SyncOrchestrator::new(session, exclusions(&["_BACKUP$"]))
        .sync(&SyncOptions {
            databases: Some(vec!["ANALYTICS".to_string()]),
            ..SyncOptions::new(dir.path())
        })
        .await
        .unwrap();
    dir
}

fn orders() -> ObjectRef {
    ObjectRef::object(ObjectCategory::Table, "ANALYTICS", "PUBLIC", "ORDERS")
}

#[tokio::test]
async fn test_fresh_after_sync() {
    let dir = synced_repo().await;
    let (session, _) = session(warehouse());
    let checker = StalenessChecker::new(session, exclusions(&[]));

    let check = checker
        .check_in_repository(&orders(), dir.path())
        .await
        .unwrap();
    assert!(!check.is_stale);
    assert_eq!(check.reason, "content matches");
}

#[tokio::test]
async fn test_local_edit_is_detected() {
    let dir = synced_repo().await;
    fs::write(
        dir.path().join("ANALYTICS/PUBLIC/tables/ORDERS.sql"),
        "create or replace table ORDERS (ID NUMBER);",
    )
    .unwrap();

    let (session, _) = session(warehouse());
    let checker = StalenessChecker::new(session, exclusions(&[]));
    let check = checker
        .check_in_repository(&orders(), dir.path())
        .await
        .unwrap();
    assert!(check.is_stale);
    assert_eq!(check.reason, "content differs");
}

#[tokio::test]
async fn test_check_whole_repository() {
    let dir = synced_repo().await;
    fs::remove_file(dir.path().join("ANALYTICS/PUBLIC/views/DAILY_REVENUE.sql")).unwrap();

    let (session, _) = session(warehouse());
    let checker = StalenessChecker::new(session, exclusions(&[]));
    let checks = checker.check_repository(dir.path()).await.unwrap();

    assert_eq!(checks.len(), 5);
    let stale: Vec<(&str, &str)> = checks
        .iter()
        .filter(|c| c.is_stale)
        .map(|c| (c.object_name.as_str(), c.reason.as_str()))
        .collect();
    assert_eq!(
        stale,
        vec![("ANALYTICS.PUBLIC.DAILY_REVENUE", "local file does not exist")]
    );
}

#[tokio::test]
async fn test_excluded_object_is_rejected() {
    let dir = synced_repo().await;
    let (session, _) = session(warehouse());
    let checker = StalenessChecker::new(session, exclusions(&["ORDERS"]));

    let err = checker
        .check_in_repository(&orders(), dir.path())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ExcludedObject);
}

fn overloaded_warehouse() -> MockExecutor {
    MockExecutor::new()
        .respond(r#"SHOW SCHEMAS IN DATABASE "LIB""#, r#"[{"name": "UTIL"}]"#)
        .respond(
            "SHOW USER FUNCTIONS",
            r#"[{"name": "F", "arguments": "F(NUMBER) RETURN NUMBER"},
                {"name": "F", "arguments": "F(VARCHAR) RETURN VARCHAR"}]"#,
        )
        .respond("GET_DDL('DATABASE'", r#"[{"D": "create database LIB;"}]"#)
        .respond("GET_DDL('SCHEMA'", r#"[{"D": "create schema UTIL;"}]"#)
        .respond(
            r#""F"(NUMBER)"#,
            r#"[{"D": "create function F(X NUMBER) returns number as 'x';"}]"#,
        )
        .respond(
            r#""F"(VARCHAR)"#,
            r#"[{"D": "create function F(X VARCHAR) returns varchar as 'x';"}]"#,
        )
}

#[tokio::test]
async fn test_overloads_are_fresh_after_sync() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(overloaded_warehouse());
    let index = SyncOrchestrator::new(session, exclusions(&[]))
        .sync(&SyncOptions {
            databases: Some(vec!["LIB".to_string()]),
            ..SyncOptions::new(dir.path())
        })
        .await
        .unwrap();
    assert_eq!(index.object_count, 4);

    let functions = dir.path().join("LIB/UTIL/functions");
    assert!(fs::read_to_string(functions.join("F(NUMBER).sql"))
        .unwrap()
        .contains("X NUMBER"));
    assert!(fs::read_to_string(functions.join("F(VARCHAR).sql"))
        .unwrap()
        .contains("X VARCHAR"));

    let (session, _) = super::common::session(overloaded_warehouse());
    let checker = StalenessChecker::new(session, exclusions(&[]));
    let checks = checker.check_repository(dir.path()).await.unwrap();

    assert_eq!(checks.len(), 4);
    assert!(checks.iter().all(|c| !c.is_stale), "{checks:#?}");

    let check = checker
        .check_staleness(
            &ObjectRef::parse(ObjectCategory::Function, "LIB.UTIL.F(VARCHAR)").unwrap(),
            &functions.join("F(VARCHAR).sql"),
        )
        .await
        .unwrap();
    assert!(!check.is_stale);
}
