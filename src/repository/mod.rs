//! Local DDL repository.
//!
//! Layout under the target directory:
//!
//! ```text
//! <db>/_database.sql
//! <db>/<schema>/_schema.sql
//! <db>/<schema>/<tables|views|stages|tasks>/<name>.sql
//! <db>/<schema>/<functions|procedures>/<name>(<argument types>).sql
//! .object-repository.json
//! ```

pub mod staleness;
pub mod sync;

pub use staleness::{content_hash, StalenessCheck, StalenessChecker};
pub use sync::{SyncOptions, SyncOrchestrator};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ObjectCategory, ObjectRef};
use crate::error::{GuardError, Result};

/// Index file written at the repository root after every sync.
pub const INDEX_FILE: &str = ".object-repository.json";

const DATABASE_FILE: &str = "_database.sql";
const SCHEMA_FILE: &str = "_schema.sql";

/// Outcome of one visited object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Skipped,
    Error,
}

/// One entry of the sync report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    #[serde(rename = "type")]
    pub object_type: ObjectCategory,
    /// Fully-qualified name.
    pub name: String,
    /// Argument types of a function or procedure, e.g. `(NUMBER)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    pub fn synced(object: &ObjectRef, path: &Path) -> Self {
        Self {
            object_type: object.category,
            name: object.fully_qualified(),
            arguments: object.arguments.clone(),
            status: SyncStatus::Synced,
            path: Some(path.display().to_string()),
            error: None,
        }
    }

    pub fn skipped(object: &ObjectRef, reason: impl Into<String>) -> Self {
        Self {
            object_type: object.category,
            name: object.fully_qualified(),
            arguments: object.arguments.clone(),
            status: SyncStatus::Skipped,
            path: None,
            error: Some(reason.into()),
        }
    }

    /// The object this record describes, signature included.
    pub fn object_ref(&self) -> Result<ObjectRef> {
        Ok(ObjectRef::parse(self.object_type, &self.name)?.with_arguments(self.arguments.clone()))
    }

    pub fn error(
        object_type: ObjectCategory,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            object_type,
            name: name.into(),
            arguments: None,
            status: SyncStatus::Error,
            path: None,
            error: Some(message.into()),
        }
    }
}

/// Contents of [`INDEX_FILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRepositoryIndex {
    pub last_sync: DateTime<Utc>,
    pub target_dir: String,
    /// Number of `synced` records.
    pub object_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub objects: Vec<SyncResult>,
}

impl ObjectRepositoryIndex {
    /// Builds the index, deriving counts from the records.
    pub fn new(target_dir: &Path, objects: Vec<SyncResult>) -> Self {
        let count = |status: SyncStatus| objects.iter().filter(|r| r.status == status).count();
        Self {
            last_sync: Utc::now(),
            target_dir: target_dir.display().to_string(),
            object_count: count(SyncStatus::Synced),
            skipped_count: count(SyncStatus::Skipped),
            error_count: count(SyncStatus::Error),
            objects,
        }
    }

    /// Records with the given status.
    pub fn with_status(&self, status: SyncStatus) -> impl Iterator<Item = &SyncResult> {
        self.objects.iter().filter(move |r| r.status == status)
    }

    /// Path of the index inside `target_dir`.
    pub fn path_in(target_dir: &Path) -> PathBuf {
        target_dir.join(INDEX_FILE)
    }

    /// Writes the index as pretty JSON.
    pub async fn write(&self, target_dir: &Path) -> Result<()> {
        let path = Self::path_in(target_dir);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::sync(format!("Failed to serialize index: {e}")))?;
        tokio::fs::write(&path, json).await.map_err(|e| {
            GuardError::sync(format!("Failed to write {}: {e}", path.display()))
        })
    }

    /// Reads the index from `target_dir`.
    pub async fn load(target_dir: &Path) -> Result<Self> {
        let path = Self::path_in(target_dir);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            GuardError::staleness(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            GuardError::staleness(format!("Invalid index {}: {e}", path.display()))
        })
    }
}

/// Makes a name safe to use as one path component.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

/// Where an object's DDL lives under `target_dir`.
///
/// Overloads get one file each: the file name of a function or procedure
/// carries its argument types when they are known.
pub fn object_path(target_dir: &Path, object: &ObjectRef) -> PathBuf {
    let database = target_dir.join(sanitize(object.database_name()));
    match object.category {
        ObjectCategory::Database => database.join(DATABASE_FILE),
        ObjectCategory::Schema => database.join(sanitize(object.name())).join(SCHEMA_FILE),
        category => database
            .join(sanitize(object.schema_name().unwrap_or_default()))
            .join(category.dir_name())
            .join(format!(
                "{}{}.sql",
                sanitize(object.name()),
                object.arguments.as_deref().map(sanitize).unwrap_or_default()
            )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let root = Path::new("/repo");
        assert_eq!(
            object_path(root, &ObjectRef::database("DB")),
            PathBuf::from("/repo/DB/_database.sql")
        );
        assert_eq!(
            object_path(root, &ObjectRef::schema("DB", "S")),
            PathBuf::from("/repo/DB/S/_schema.sql")
        );
        assert_eq!(
            object_path(
                root,
                &ObjectRef::object(ObjectCategory::Procedure, "DB", "S", "LOAD")
                    .with_arguments(Some("(VARCHAR)".to_string()))
            ),
            PathBuf::from("/repo/DB/S/procedures/LOAD(VARCHAR).sql")
        );
        assert_eq!(
            object_path(
                root,
                &ObjectRef::object(ObjectCategory::Table, "DB", "S", "T")
            ),
            PathBuf::from("/repo/DB/S/tables/T.sql")
        );
    }

    #[test]
    fn test_overloads_get_separate_files() {
        let root = Path::new("/repo");
        let f = |args: &str| {
            ObjectRef::object(ObjectCategory::Function, "DB", "S", "F")
                .with_arguments(Some(args.to_string()))
        };
        assert_eq!(
            object_path(root, &f("(NUMBER)")),
            PathBuf::from("/repo/DB/S/functions/F(NUMBER).sql")
        );
        assert_eq!(
            object_path(root, &f("(NUMBER, VARCHAR)")),
            PathBuf::from("/repo/DB/S/functions/F(NUMBER, VARCHAR).sql")
        );
        assert_ne!(object_path(root, &f("()")), object_path(root, &f("(NUMBER)")));
    }

    #[test]
    fn test_record_keeps_signature() {
        let f = ObjectRef::object(ObjectCategory::Function, "DB", "S", "F")
            .with_arguments(Some("(NUMBER)".to_string()));
        let record = SyncResult::synced(&f, Path::new("/repo/DB/S/functions/F(NUMBER).sql"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["arguments"], "(NUMBER)");
        assert_eq!(record.object_ref().unwrap(), f);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a/b\\c"), "a_b_c");
        assert_eq!(sanitize("ok name"), "ok name");
        assert_eq!(sanitize(".."), "__");
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn test_index_counts_and_shape() {
        let t = ObjectRef::object(ObjectCategory::Table, "DB", "S", "T");
        let index = ObjectRepositoryIndex::new(
            Path::new("/repo"),
            vec![
                SyncResult::synced(&t, Path::new("/repo/DB/S/tables/T.sql")),
                SyncResult::skipped(&t, "Excluded by pattern"),
                SyncResult::error(ObjectCategory::View, "DB.S", "boom"),
            ],
        );
        assert_eq!(
            (index.object_count, index.skipped_count, index.error_count),
            (1, 1, 1)
        );

        let json = serde_json::to_value(&index).unwrap();
        assert!(json.get("lastSync").is_some());
        assert_eq!(json["objectCount"], 1);
        assert_eq!(json["objects"][0]["type"], "table");
        assert_eq!(json["objects"][0]["status"], "synced");
        assert!(json["objects"][0].get("error").is_none());
        assert_eq!(json["objects"][1]["error"], "Excluded by pattern");
    }

    #[tokio::test]
    async fn test_index_write_then_load() {
        let dir = TempDir::new().unwrap();
        let index = ObjectRepositoryIndex::new(dir.path(), vec![]);
        index.write(dir.path()).await.unwrap();

        let loaded = ObjectRepositoryIndex::load(dir.path()).await.unwrap();
        assert_eq!(loaded, index);
    }

    #[tokio::test]
    async fn test_load_missing_index() {
        let dir = TempDir::new().unwrap();
        let err = ObjectRepositoryIndex::load(dir.path()).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::StalenessCheckError);
    }
}
