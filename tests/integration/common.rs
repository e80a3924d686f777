//! Shared fixtures: a small scripted warehouse.

use std::sync::Arc;

use snowguard::config::ExclusionConfig;
use snowguard::executor::{ExecOptions, MockExecutor, Session, DEFAULT_TIMEOUT};
use snowguard::safety::ExclusionChecker;

/// `ANALYTICS.PUBLIC` holds `ORDERS`, `ORDERS_BACKUP`, a view and a
/// function; `HR.PAYROLL` holds `SALARIES`.
pub fn warehouse() -> MockExecutor {
    MockExecutor::new()
        .respond("SHOW DATABASES", r#"[{"name": "ANALYTICS"}, {"name": "HR"}]"#)
        .respond(
            r#"SHOW SCHEMAS IN DATABASE "ANALYTICS""#,
            r#"[{"name": "INFORMATION_SCHEMA"}, {"name": "PUBLIC"}]"#,
        )
        .respond(r#"SHOW SCHEMAS IN DATABASE "HR""#, r#"[{"name": "PAYROLL"}]"#)
        .respond(
            r#"SHOW TABLES IN SCHEMA "ANALYTICS"."PUBLIC""#,
            r#"[{"name": "ORDERS", "database_name": "ANALYTICS", "schema_name": "PUBLIC"},
                {"name": "ORDERS_BACKUP", "database_name": "ANALYTICS", "schema_name": "PUBLIC"}]"#,
        )
        .respond(
            r#"SHOW TABLES IN SCHEMA "HR"."PAYROLL""#,
            r#"[{"name": "SALARIES", "database_name": "HR", "schema_name": "PAYROLL"}]"#,
        )
        .respond(
            r#"SHOW VIEWS IN SCHEMA "ANALYTICS"."PUBLIC""#,
            r#"[{"name": "DAILY_REVENUE"}]"#,
        )
        .respond(
            r#"SHOW USER FUNCTIONS IN SCHEMA "ANALYTICS"."PUBLIC""#,
            r#"[{"name": "NET", "arguments": "NET(NUMBER, NUMBER) RETURN NUMBER"}]"#,
        )
        .respond("GET_DDL('DATABASE'", r#"[{"GET_DDL": "create database X;"}]"#)
        .respond("GET_DDL('SCHEMA'", r#"[{"GET_DDL": "create schema X;"}]"#)
        .respond(
            r#"GET_DDL('TABLE', '"ANALYTICS"."PUBLIC"."ORDERS"')"#,
            r#"[{"GET_DDL": "create or replace table ORDERS (ID NUMBER, EMAIL VARCHAR);"}]"#,
        )
        .respond("GET_DDL('TABLE'", r#"[{"GET_DDL": "create table X (A NUMBER);"}]"#)
        .respond(
            "GET_DDL('VIEW'",
            r#"[{"GET_DDL": "create view DAILY_REVENUE as select 1 as R;"}]"#,
        )
        .respond(
            "GET_DDL('FUNCTION'",
            r#"[{"GET_DDL": "create function NET(A NUMBER, B NUMBER) returns number as 'a - b';"}]"#,
        )
        .respond(
            "FROM ANALYTICS.PUBLIC.ORDERS",
            r#"[{"ID": 1, "EMAIL": "alice@example.com"}, {"ID": 2, "EMAIL": "bob@example.com"}]"#,
        )
}

pub fn exclusions(patterns: &[&str]) -> ExclusionChecker {
    ExclusionChecker::new(&ExclusionConfig {
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        object_types: vec![],
    })
    .unwrap()
}

pub fn session(mock: MockExecutor) -> (Session, Arc<MockExecutor>) {
    let mock = Arc::new(mock);
    (
        Session::new(mock.clone(), ExecOptions::default(), DEFAULT_TIMEOUT),
        mock,
    )
}
