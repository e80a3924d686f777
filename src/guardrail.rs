//! Metadata-only query gateway.
//!
//! Every request is classified, scanned for object references and checked
//! against the exclusion rules before anything reaches the warehouse. What
//! comes back is redacted to schema and row count.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{
    qualified_name_of, quote_path, split_qualified, Catalog, ObjectCategory, ObjectRef, Row,
};
use crate::error::{GuardError, Result};
use crate::executor::Session;
use crate::logging::AUDIT_TARGET;
use crate::redact::{redact_str, RedactionOutcome};
use crate::safety::{
    extract_object_names, visible_ddl, ExclusionChecker, ExclusionResult, QueryClassification,
    QueryClassifier,
};

/// An object reference and its exclusion verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVerdict {
    pub name: String,
    #[serde(flatten)]
    pub result: ExclusionResult,
}

/// What the guardrail would decide about a statement, without running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInspection {
    pub classification: QueryClassification,
    pub objects: Vec<String>,
    pub exclusions: Vec<ObjectVerdict>,
}

/// Answer to an executed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub classification: QueryClassification,
    pub objects: Vec<String>,
    pub result: RedactionOutcome,
    pub execution_ms: u64,
}

/// Column metadata of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribeResponse {
    pub name: String,
    pub columns: Vec<Row>,
}

/// A filtered `SHOW` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(rename = "type")]
    pub object_type: ObjectCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub objects: Vec<Row>,
}

/// One object's DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlResponse {
    #[serde(rename = "type")]
    pub object_type: ObjectCategory,
    pub name: String,
    pub ddl: String,
}

/// The guardrail proxy.
pub struct Guardrail {
    session: Session,
    catalog: Catalog,
    classifier: QueryClassifier,
    exclusions: ExclusionChecker,
}

impl Guardrail {
    pub fn new(session: Session, exclusions: ExclusionChecker) -> Self {
        Self {
            catalog: Catalog::new(session.clone()),
            session,
            classifier: QueryClassifier::new(),
            exclusions,
        }
    }

    /// Classifies `sql` and checks every referenced object. Never executes.
    pub fn inspect(&self, sql: &str) -> QueryInspection {
        let objects = extract_object_names(sql);
        let exclusions = objects
            .iter()
            .map(|name| ObjectVerdict {
                name: name.clone(),
                result: self.exclusions.check(name),
            })
            .collect();
        QueryInspection {
            classification: self.classifier.classify(sql),
            objects,
            exclusions,
        }
    }

    /// Runs `sql` if no referenced object is excluded and returns the
    /// redacted answer.
    pub async fn execute_query(&self, sql: &str) -> Result<QueryResponse> {
        if sql.trim().is_empty() {
            return Err(GuardError::invalid_input("SQL must not be empty"));
        }

        let inspection = self.inspect(sql);
        if let Some((name, verdict)) = self.exclusions.first_excluded(&inspection.objects) {
            let pattern = verdict.matched_pattern.unwrap_or_default();
            warn!(
                target: AUDIT_TARGET,
                object = %name,
                pattern = %pattern,
                query_type = %inspection.classification.query_type,
                "Blocked query referencing excluded object"
            );
            return Err(GuardError::excluded(format!(
                "{name} matches exclusion pattern {pattern}"
            )));
        }

        let start = Instant::now();
        let output = self.session.run_sql_raw(sql).await?;
        let execution_ms = start.elapsed().as_millis() as u64;
        if !output.is_success() {
            return Err(GuardError::from_cli_output(&output));
        }

        let result = redact_str(&output.stdout);
        info!(
            target: AUDIT_TARGET,
            query_type = %inspection.classification.query_type,
            objects = inspection.objects.len(),
            rows = result.row_count().unwrap_or_default(),
            row_data_withheld = inspection.classification.may_return_rows(),
            execution_ms,
            "Executed query"
        );

        Ok(QueryResponse {
            classification: inspection.classification,
            objects: inspection.objects,
            result,
            execution_ms,
        })
    }

    /// `DESCRIBE TABLE` for one object. Its rows are column metadata and are
    /// returned as-is.
    pub async fn describe_object(&self, name: &str) -> Result<DescribeResponse> {
        let parts = split_qualified(name);
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(GuardError::invalid_input(format!("Invalid object name: '{name}'")));
        }
        let qualified = parts.join(".");
        self.ensure_allowed(&qualified)?;

        let sql = format!("DESCRIBE TABLE {}", quote_path(&parts));
        let columns = self.catalog.query_rows(&sql).await?;
        Ok(DescribeResponse {
            name: qualified,
            columns,
        })
    }

    /// `SHOW <category> [IN <scope>]` with excluded entries removed.
    ///
    /// A one-part scope is a database, a two-part scope a schema.
    pub async fn list_objects(
        &self,
        category: ObjectCategory,
        scope: Option<&str>,
    ) -> Result<ListResponse> {
        self.ensure_type_allowed(category)?;

        let mut sql = format!("SHOW {}", category.show_keyword());
        let scope = match scope.map(split_qualified) {
            Some(parts) => {
                let qualified = parts.join(".");
                self.ensure_allowed(&qualified)?;
                let container = match parts.len() {
                    1 if category != ObjectCategory::Database => "DATABASE",
                    2 if category.depth() == 3 => "SCHEMA",
                    _ => {
                        return Err(GuardError::invalid_input(format!(
                            "Scope '{qualified}' does not contain {}",
                            category.show_keyword().to_lowercase()
                        )))
                    }
                };
                sql.push_str(&format!(" IN {container} {}", quote_path(&parts)));
                Some(qualified)
            }
            None => None,
        };

        let rows = self.catalog.query_rows(&sql).await?;
        let total = rows.len();
        let objects: Vec<Row> = rows
            .into_iter()
            .filter(|row| {
                let name = listed_name(row, category, scope.as_deref());
                !name.is_some_and(|n| self.exclusions.is_excluded(&n))
            })
            .collect();

        if objects.len() < total {
            info!(
                target: AUDIT_TARGET,
                category = %category,
                hidden = total - objects.len(),
                "Filtered excluded objects from listing"
            );
        }

        Ok(ListResponse {
            object_type: category,
            scope,
            objects,
        })
    }

    /// Fetches one object's DDL. Database and schema DDL comes back without
    /// the statements of excluded objects inside them.
    pub async fn get_ddl(&self, category: ObjectCategory, name: &str) -> Result<DdlResponse> {
        self.ensure_type_allowed(category)?;
        let object = ObjectRef::parse(category, name)?;
        let qualified = object.fully_qualified();
        self.ensure_allowed(&qualified)?;

        let object = self.catalog.resolve_arguments(&object).await?;
        let ddl = self
            .catalog
            .fetch_ddl(&object)
            .await?
            .ok_or_else(|| GuardError::not_found(format!("No DDL returned for {qualified}")))?;
        let ddl = visible_ddl(&object, ddl, &self.exclusions);

        Ok(DdlResponse {
            object_type: category,
            name: qualified,
            ddl,
        })
    }

    fn ensure_allowed(&self, name: &str) -> Result<()> {
        let verdict = self.exclusions.check(name);
        if !verdict.is_excluded {
            return Ok(());
        }
        let pattern = verdict.matched_pattern.unwrap_or_default();
        warn!(target: AUDIT_TARGET, object = %name, pattern = %pattern, "Blocked request for excluded object");
        Err(GuardError::excluded(format!(
            "{name} matches exclusion pattern {pattern}"
        )))
    }

    fn ensure_type_allowed(&self, category: ObjectCategory) -> Result<()> {
        if self.exclusions.is_type_excluded(category.keyword()) {
            warn!(target: AUDIT_TARGET, category = %category, "Blocked request for excluded object type");
            return Err(GuardError::excluded(format!(
                "Object type {} is excluded",
                category.keyword()
            )));
        }
        Ok(())
    }
}

/// Fully-qualified name of a listing row, completed from the scope when the
/// row lacks its container columns.
fn listed_name(row: &Row, category: ObjectCategory, scope: Option<&str>) -> Option<String> {
    let name = qualified_name_of(row)?;
    let parts = name.split('.').count();
    match scope {
        Some(scope) if parts < category.depth() => Some(format!("{scope}.{name}")),
        _ => Some(name),
    }
}
