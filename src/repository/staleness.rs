//! Staleness detection: compares the SHA-256 of remote DDL with the copy on
//! disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{object_path, ObjectRepositoryIndex, SyncStatus};
use crate::catalog::{Catalog, ObjectCategory, ObjectRef};
use crate::error::{GuardError, Result};
use crate::executor::Session;
use crate::logging::AUDIT_TARGET;
use crate::safety::{visible_ddl, ExclusionChecker};

pub const REASON_MISSING: &str = "local file does not exist";
pub const REASON_MATCHES: &str = "content matches";
pub const REASON_DIFFERS: &str = "content differs";

/// Result of comparing one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StalenessCheck {
    pub is_stale: bool,
    pub object_name: String,
    pub object_type: ObjectCategory,
    pub local_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_hash: Option<String>,
    pub reason: String,
}

/// Hex SHA-256 of `data`.
pub fn content_hash(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Checks local DDL copies against the warehouse.
pub struct StalenessChecker {
    catalog: Catalog,
    exclusions: ExclusionChecker,
}

impl StalenessChecker {
    pub fn new(session: Session, exclusions: ExclusionChecker) -> Self {
        Self {
            catalog: Catalog::new(session),
            exclusions,
        }
    }

    /// Compares `object`'s remote DDL with `local_path`.
    ///
    /// Excluded objects are rejected before any remote call.
    pub async fn check_staleness(
        &self,
        object: &ObjectRef,
        local_path: &Path,
    ) -> Result<StalenessCheck> {
        let name = object.fully_qualified();
        self.ensure_allowed(&name)?;

        let object = self.catalog.resolve_arguments(object).await?;
        let current = self
            .catalog
            .fetch_ddl(&object)
            .await?
            .ok_or_else(|| GuardError::not_found(format!("No DDL returned for {name}")))?;
        let current = visible_ddl(&object, current, &self.exclusions);
        let current_hash = content_hash(&current);

        let mut check = StalenessCheck {
            is_stale: true,
            object_name: name,
            object_type: object.category,
            local_path: local_path.display().to_string(),
            current_hash: Some(current_hash),
            local_hash: None,
            reason: REASON_MISSING.to_string(),
        };

        let local = match tokio::fs::read(local_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(check),
            Err(e) => {
                return Err(GuardError::staleness(format!(
                    "Failed to read {}: {e}",
                    local_path.display()
                )))
            }
        };

        let local_hash = content_hash(&local);
        check.is_stale = check.current_hash.as_deref() != Some(local_hash.as_str());
        check.reason = if check.is_stale { REASON_DIFFERS } else { REASON_MATCHES }.to_string();
        check.local_hash = Some(local_hash);

        debug!(object = %check.object_name, stale = check.is_stale, "Staleness checked");
        Ok(check)
    }

    /// Like [`check_staleness`](Self::check_staleness), with the local path
    /// taken from the repository layout under `target_dir`.
    ///
    /// A function or procedure given without argument types resolves to the
    /// first listed overload.
    pub async fn check_in_repository(
        &self,
        object: &ObjectRef,
        target_dir: &Path,
    ) -> Result<StalenessCheck> {
        self.ensure_allowed(&object.fully_qualified())?;
        let object = self.catalog.resolve_arguments(object).await?;
        self.check_staleness(&object, &object_path(target_dir, &object))
            .await
    }

    /// Checks every synced entry of the repository index, one at a time.
    /// Per-object failures are reported as stale with the error as reason.
    pub async fn check_repository(&self, target_dir: &Path) -> Result<Vec<StalenessCheck>> {
        let index = ObjectRepositoryIndex::load(target_dir).await?;
        let mut checks = Vec::new();

        for entry in index.with_status(SyncStatus::Synced) {
            let object = entry.object_ref();
            let local_path = match (&entry.path, &object) {
                (Some(path), _) => PathBuf::from(path),
                (None, Ok(object)) => object_path(target_dir, object),
                (None, Err(_)) => target_dir.to_path_buf(),
            };

            let outcome = match object {
                Ok(object) => self.check_staleness(&object, &local_path).await,
                Err(e) => Err(e),
            };

            checks.push(outcome.unwrap_or_else(|e| StalenessCheck {
                is_stale: true,
                object_name: entry.name.clone(),
                object_type: entry.object_type,
                local_path: local_path.display().to_string(),
                current_hash: None,
                local_hash: None,
                reason: e.to_string(),
            }));
        }

        info!(
            checked = checks.len(),
            stale = checks.iter().filter(|c| c.is_stale).count(),
            "Repository staleness check finished"
        );
        Ok(checks)
    }

    fn ensure_allowed(&self, name: &str) -> Result<()> {
        let verdict = self.exclusions.check(name);
        if !verdict.is_excluded {
            return Ok(());
        }
        let pattern = verdict.matched_pattern.unwrap_or_default();
        info!(target: AUDIT_TARGET, object = %name, pattern = %pattern, "Rejected staleness check");
        Err(GuardError::excluded(format!(
            "{name} matches exclusion pattern {pattern}"
        )))
    }
}
