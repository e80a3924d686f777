//! Guardrail integration tests.

use pretty_assertions::assert_eq;
use serde_json::json;

use snowguard::catalog::ObjectCategory;
use snowguard::error::ErrorCode;
use snowguard::guardrail::Guardrail;
use snowguard::safety::QueryType;

use super::common::{exclusions, session, warehouse};

#[tokio::test]
async fn test_data_query_returns_shape_only() {
    let (session, _) = session(warehouse());
    let guardrail = Guardrail::new(session, exclusions(&["^HR\\."]));

    let response = guardrail
        .execute_query("SELECT id, email FROM ANALYTICS.PUBLIC.ORDERS")
        .await
        .unwrap();

    assert_eq!(response.classification.query_type, QueryType::Data);
    assert_eq!(response.objects, vec!["ANALYTICS.PUBLIC.ORDERS"]);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json["result"],
        json!({
            "metadata": {
                "columns": [
                    {"name": "ID", "type": "number", "nullable": false},
                    {"name": "EMAIL", "type": "string", "nullable": false}
                ],
                "rowCount": 2
            },
            "data": []
        })
    );
    assert!(!json.to_string().contains("example.com"));
}

#[tokio::test]
async fn test_excluded_table_in_any_clause_is_blocked() {
    let queries = [
        "SELECT * FROM HR.PAYROLL.SALARIES",
        "SELECT o.id FROM ANALYTICS.PUBLIC.ORDERS o JOIN HR.PAYROLL.SALARIES s ON o.id = s.id",
        "SELECT * FROM ANALYTICS.PUBLIC.ORDERS o, hr.payroll.salaries s",
        "INSERT INTO ANALYTICS.PUBLIC.COPY SELECT * FROM HR.PAYROLL.SALARIES",
        "DESCRIBE TABLE HR.PAYROLL.SALARIES",
        "SELECT GET_DDL('TABLE', 'HR.PAYROLL.SALARIES')",
        "SHOW TABLES IN SCHEMA HR.PAYROLL",
        "SELECT * FROM (SELECT 1 AS x) s, HR.PAYROLL.SALARIES p",
        "SELECT * FROM TABLE(FLATTEN(input => PARSE_JSON('[1]'))) f, HR.PAYROLL.SALARIES p",
        "SELECT * FROM/**/HR.PAYROLL.SALARIES",
        "SELECT * FROM ANALYTICS.PUBLIC.ORDERS o -- trailing\n, HR.PAYROLL.SALARIES s",
        "MERGE INTO ANALYTICS.PUBLIC.ORDERS t USING HR.PAYROLL.SALARIES s ON t.id = s.id \
         WHEN MATCHED THEN UPDATE SET t.email = s.email",
        "DELETE FROM ANALYTICS.PUBLIC.ORDERS USING HR.PAYROLL.SALARIES s WHERE 1=1",
    ];

    for sql in queries {
        let (session, mock) = session(warehouse());
        let guardrail = Guardrail::new(session, exclusions(&["^HR\\."]));
        let err = guardrail.execute_query(sql).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExcludedObject, "SQL: {sql}");
        assert!(mock.calls().is_empty(), "SQL reached the warehouse: {sql}");
    }
}

#[tokio::test]
async fn test_error_envelope_shape() {
    let (session, _) = session(warehouse());
    let guardrail = Guardrail::new(session, exclusions(&["_BACKUP$"]));

    let err = guardrail
        .execute_query("SELECT * FROM ANALYTICS.PUBLIC.ORDERS_BACKUP")
        .await
        .unwrap_err();
    let envelope = serde_json::to_value(err.to_envelope()).unwrap();

    assert_eq!(envelope["code"], "EXCLUDED_OBJECT");
    assert_eq!(envelope["error"], "Excluded object");
    assert!(envelope["message"]
        .as_str()
        .unwrap()
        .contains("ANALYTICS.PUBLIC.ORDERS_BACKUP"));
}

#[tokio::test]
async fn test_listing_hides_excluded_objects() {
    let (session, _) = session(warehouse());
    let guardrail = Guardrail::new(session, exclusions(&["_BACKUP$"]));

    let listing = guardrail
        .list_objects(ObjectCategory::Table, Some("ANALYTICS.PUBLIC"))
        .await
        .unwrap();
    let names: Vec<&str> = listing
        .objects
        .iter()
        .filter_map(|row| row.get("name").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(names, vec!["ORDERS"]);
}

#[tokio::test]
async fn test_function_ddl_resolves_signature() {
    let (session, mock) = session(warehouse());
    let guardrail = Guardrail::new(session, exclusions(&[]));

    let ddl = guardrail
        .get_ddl(ObjectCategory::Function, "ANALYTICS.PUBLIC.NET")
        .await
        .unwrap();
    assert!(ddl.ddl.starts_with("create function NET"));
    assert!(mock
        .sql_calls()
        .iter()
        .any(|sql| sql.contains(r#""NET"(NUMBER, NUMBER)"#)));
}
