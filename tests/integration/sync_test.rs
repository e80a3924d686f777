//! Repository sync integration tests.

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use snowguard::catalog::ObjectCategory;
use snowguard::repository::{ObjectRepositoryIndex, SyncOptions, SyncOrchestrator, SyncStatus};

use super::common::{exclusions, session, warehouse};

#[tokio::test]
async fn test_sync_mirrors_allowed_objects() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(warehouse());
    let orchestrator = SyncOrchestrator::new(session, exclusions(&["^HR$", "_BACKUP$"]));

    let index = orchestrator
        .sync(&SyncOptions::new(dir.path()))
        .await
        .unwrap();
    let root = dir.path();

    assert_eq!(
        fs::read_to_string(root.join("ANALYTICS/PUBLIC/tables/ORDERS.sql")).unwrap(),
        "create or replace table ORDERS (ID NUMBER, EMAIL VARCHAR);"
    );
    assert!(root.join("ANALYTICS/_database.sql").exists());
    assert!(root.join("ANALYTICS/PUBLIC/_schema.sql").exists());
    assert!(root.join("ANALYTICS/PUBLIC/views/DAILY_REVENUE.sql").exists());
    assert!(root.join("ANALYTICS/PUBLIC/functions/NET(NUMBER, NUMBER).sql").exists());
    assert!(!root.join("ANALYTICS/PUBLIC/tables/ORDERS_BACKUP.sql").exists());
    assert!(!root.join("HR").exists());

    let skipped: Vec<&str> = index
        .with_status(SyncStatus::Skipped)
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(skipped, vec!["ANALYTICS.PUBLIC.ORDERS_BACKUP", "HR"]);
    assert_eq!(index.skipped_count, 2);
    assert_eq!(index.object_count, 5);
}

#[tokio::test]
async fn test_excluded_database_is_never_enumerated() {
    let dir = TempDir::new().unwrap();
    let (session, mock) = session(warehouse());
    let orchestrator = SyncOrchestrator::new(session, exclusions(&["^HR$"]));

    orchestrator
        .sync(&SyncOptions::new(dir.path()))
        .await
        .unwrap();

    assert!(!mock.sql_calls().iter().any(|sql| sql.contains("\"HR\"")));
}

#[tokio::test]
async fn test_index_persisted_with_counts() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(warehouse());
    let orchestrator = SyncOrchestrator::new(session, exclusions(&["_BACKUP$"]));

    let index = orchestrator
        .sync(&SyncOptions {
            databases: Some(vec!["ANALYTICS".to_string()]),
            ..SyncOptions::new(dir.path())
        })
        .await
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(".object-repository.json")).unwrap())
            .unwrap();
    assert_eq!(raw["objectCount"], index.object_count);
    assert_eq!(raw["skippedCount"], 1);
    assert_eq!(raw["errorCount"], 0);
    assert!(raw["lastSync"].as_str().unwrap().contains('T'));

    let loaded = ObjectRepositoryIndex::load(dir.path()).await.unwrap();
    assert_eq!(loaded, index);
}

#[tokio::test]
async fn test_views_only_sync() {
    let dir = TempDir::new().unwrap();
    let (session, _) = session(warehouse());
    let orchestrator = SyncOrchestrator::new(session, exclusions(&[]));

    let index = orchestrator
        .sync(&SyncOptions {
            databases: Some(vec!["ANALYTICS".to_string()]),
            include_tables: false,
            include_functions: false,
            include_procedures: false,
            include_stages: false,
            include_tasks: false,
            ..SyncOptions::new(dir.path())
        })
        .await
        .unwrap();

    let types: Vec<ObjectCategory> = index.objects.iter().map(|r| r.object_type).collect();
    assert_eq!(
        types,
        vec![
            ObjectCategory::Database,
            ObjectCategory::Schema,
            ObjectCategory::View
        ]
    );
}
