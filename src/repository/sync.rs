//! Repository sync.
//!
//! Walks Database → Schema → objects with an explicit stack, one executor
//! call at a time, and mirrors every allowed object's DDL to disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{object_path, ObjectRepositoryIndex, SyncResult};
use crate::catalog::{Catalog, ObjectCategory, ObjectRef};
use crate::config::RepositoryConfig;
use crate::error::{GuardError, Result};
use crate::executor::Session;
use crate::logging::AUDIT_TARGET;
use crate::safety::{visible_ddl, ExclusionChecker};

/// Reason recorded for objects matched by an exclusion rule.
pub const EXCLUDED_REASON: &str = "Excluded by pattern";

/// What to sync and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub target_dir: PathBuf,
    /// Databases to walk; `None` walks everything `SHOW DATABASES` returns.
    pub databases: Option<Vec<String>>,
    pub include_tables: bool,
    pub include_views: bool,
    pub include_functions: bool,
    pub include_procedures: bool,
    pub include_stages: bool,
    pub include_tasks: bool,
    /// Record failed or empty DDL fetches as `error` entries.
    pub record_fetch_failures: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::new(RepositoryConfig::default().target_dir)
    }
}

impl SyncOptions {
    /// Everything enabled, writing to `target_dir`.
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            databases: None,
            include_tables: true,
            include_views: true,
            include_functions: true,
            include_procedures: true,
            include_stages: true,
            include_tasks: true,
            record_fetch_failures: false,
        }
    }

    /// Whether schema children of `category` are walked.
    pub fn includes(&self, category: ObjectCategory) -> bool {
        match category {
            ObjectCategory::Database | ObjectCategory::Schema => true,
            ObjectCategory::Table => self.include_tables,
            ObjectCategory::View => self.include_views,
            ObjectCategory::Function => self.include_functions,
            ObjectCategory::Procedure => self.include_procedures,
            ObjectCategory::Stage => self.include_stages,
            ObjectCategory::Task => self.include_tasks,
        }
    }
}

/// Mirrors remote DDL into a local directory tree.
pub struct SyncOrchestrator {
    catalog: Catalog,
    exclusions: ExclusionChecker,
}

impl SyncOrchestrator {
    pub fn new(session: Session, exclusions: ExclusionChecker) -> Self {
        Self {
            catalog: Catalog::new(session),
            exclusions,
        }
    }

    /// Runs a full sync and writes the index.
    ///
    /// Only filesystem failures (and failing to enumerate databases at all)
    /// abort; every per-object problem becomes a record.
    pub async fn sync(&self, options: &SyncOptions) -> Result<ObjectRepositoryIndex> {
        let target_dir = options.target_dir.as_path();
        tokio::fs::create_dir_all(target_dir).await.map_err(|e| {
            GuardError::sync(format!(
                "Failed to create target directory {}: {e}",
                target_dir.display()
            ))
        })?;

        let databases = match &options.databases {
            Some(names) => names.clone(),
            None => self
                .catalog
                .list_databases()
                .await
                .map_err(|e| GuardError::sync(format!("Failed to list databases: {}", e.message())))?
                .into_iter()
                .map(|entry| entry.name)
                .collect(),
        };

        info!(
            target_dir = %target_dir.display(),
            databases = databases.len(),
            "Starting repository sync"
        );

        let mut stack: Vec<ObjectRef> = databases.into_iter().rev().map(ObjectRef::database).collect();
        let mut results = Vec::new();

        while let Some(object) = stack.pop() {
            let name = object.fully_qualified();
            debug!(object = %name, category = %object.category, "Visiting");

            let verdict = self.exclusions.check(&name);
            if verdict.is_excluded {
                info!(
                    target: AUDIT_TARGET,
                    object = %name,
                    category = %object.category,
                    pattern = verdict.matched_pattern.as_deref().unwrap_or_default(),
                    "Skipped excluded object"
                );
                results.push(SyncResult::skipped(&object, EXCLUDED_REASON));
                continue;
            }

            if let Some(result) = self.mirror(&object, target_dir, options).await? {
                results.push(result);
            }

            let children = self.children(&object, options, &mut results).await;
            stack.extend(children.into_iter().rev());
        }

        let index = ObjectRepositoryIndex::new(target_dir, results);
        index.write(target_dir).await?;

        info!(
            synced = index.object_count,
            skipped = index.skipped_count,
            errors = index.error_count,
            "Repository sync finished"
        );
        Ok(index)
    }

    /// Fetches and writes one object's DDL.
    async fn mirror(
        &self,
        object: &ObjectRef,
        target_dir: &Path,
        options: &SyncOptions,
    ) -> Result<Option<SyncResult>> {
        let failure = match self.catalog.fetch_ddl(object).await {
            Ok(Some(ddl)) => {
                let ddl = visible_ddl(object, ddl, &self.exclusions);
                let path = object_path(target_dir, object);
                write_ddl(&path, &ddl).await?;
                return Ok(Some(SyncResult::synced(object, &path)));
            }
            Ok(None) => "Empty DDL".to_string(),
            Err(e) => e.message().to_string(),
        };

        warn!(object = %object, error = %failure, "DDL fetch failed");
        Ok(options
            .record_fetch_failures
            .then(|| SyncResult::error(object.category, object.fully_qualified(), failure)))
    }

    /// Enumerates the next level under `object`. Listing failures are
    /// recorded against the container.
    async fn children(
        &self,
        object: &ObjectRef,
        options: &SyncOptions,
        results: &mut Vec<SyncResult>,
    ) -> Vec<ObjectRef> {
        match object.category {
            ObjectCategory::Database => {
                let database = object.database_name();
                match self.catalog.list_schemas(database).await {
                    Ok(schemas) => schemas
                        .into_iter()
                        .map(|s| ObjectRef::schema(database, s.name))
                        .collect(),
                    Err(e) => {
                        results.push(listing_error(object, ObjectCategory::Schema, &e));
                        Vec::new()
                    }
                }
            }
            ObjectCategory::Schema => {
                let (database, schema) = (object.database_name(), object.name());
                let mut children = Vec::new();
                for category in ObjectCategory::SCHEMA_CHILDREN {
                    if !options.includes(category)
                        || self.exclusions.is_type_excluded(category.keyword())
                    {
                        continue;
                    }
                    match self.catalog.list_objects(category, database, schema).await {
                        Ok(entries) => children.extend(entries.into_iter().map(|entry| {
                            ObjectRef::object(category, database, schema, entry.name)
                                .with_arguments(entry.arguments)
                        })),
                        Err(e) => results.push(listing_error(object, category, &e)),
                    }
                }
                children
            }
            _ => Vec::new(),
        }
    }
}

fn listing_error(parent: &ObjectRef, listed: ObjectCategory, error: &GuardError) -> SyncResult {
    warn!(parent = %parent, listed = %listed, error = %error, "Listing failed");
    SyncResult::error(
        parent.category,
        parent.fully_qualified(),
        format!(
            "Failed to list {}: {}",
            listed.show_keyword().to_lowercase(),
            error.message()
        ),
    )
}

async fn write_ddl(path: &Path, ddl: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            GuardError::sync(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }
    tokio::fs::write(path, ddl)
        .await
        .map_err(|e| GuardError::sync(format!("Failed to write {}: {e}", path.display())))
}
