//! Exclusion filtering for container DDL.
//!
//! `GET_DDL` on a database or schema returns the DDL of everything inside
//! it. Statements that create excluded objects, or objects under an
//! excluded container, are removed before the text is written or returned.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::info;

use super::ExclusionChecker;
use crate::catalog::{split_qualified, ObjectCategory, ObjectRef};
use crate::logging::AUDIT_TARGET;

const PART: &str = r#"(?:"(?:[^"]|"")+"|[A-Za-z_$][\w$]*)"#;

static OBJECT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    let source = format!(
        concat!(
            r"^\s*(?:CREATE|ALTER)\s+(?:OR\s+REPLACE\s+)?(?:[A-Z_]+\s+)*?",
            r"(DATABASE|SCHEMA|TABLE|VIEW|FUNCTION|PROCEDURE|STAGE|TASK|SEQUENCE|STREAM|PIPE|TAG|ALERT|",
            r"FILE\s+FORMAT|MASKING\s+POLICY|ROW\s+ACCESS\s+POLICY)\s+",
            r"(?:IF\s+NOT\s+EXISTS\s+)?({part}(?:\.{part})*)"
        ),
        part = PART
    );
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .expect("built-in DDL header pattern must compile")
});

/// Container DDL after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredDdl {
    pub ddl: String,
    /// Qualified names whose statements were dropped.
    pub removed: Vec<String>,
}

/// Splits DDL text after each top-level `;`. Quoted text and `$$` bodies
/// are not split; the pieces concatenate back to `ddl`.
fn split_statements(ddl: &str) -> Vec<&str> {
    let bytes = ddl.as_bytes();
    let mut statements = Vec::new();
    let mut quote: Option<u8> = None;
    let mut in_dollar_body = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let dollars = b == b'$' && bytes.get(i + 1) == Some(&b'$');
        if in_dollar_body {
            if dollars {
                in_dollar_body = false;
                i += 1;
            }
        } else if let Some(q) = quote {
            if b == b'\\' && q == b'\'' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else if dollars {
            in_dollar_body = true;
            i += 1;
        } else {
            match b {
                b'\'' | b'"' => quote = Some(b),
                b';' => {
                    statements.push(&ddl[start..=i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }

    if start < ddl.len() {
        statements.push(&ddl[start..]);
    }
    statements
}

/// Tracks the database and schema the statements so far have created, so
/// unqualified names can be completed.
struct Scope {
    database: String,
    schema: Option<String>,
}

impl Scope {
    fn qualify(&mut self, kind: &str, mut parts: Vec<String>) -> Vec<String> {
        match kind {
            "DATABASE" => {
                self.database = parts.last().cloned().unwrap_or_default();
                self.schema = None;
                vec![self.database.clone()]
            }
            "SCHEMA" => {
                if parts.len() == 1 {
                    parts.insert(0, self.database.clone());
                } else if let Some(db) = parts.first() {
                    self.database = db.clone();
                }
                self.schema = parts.last().cloned();
                parts
            }
            _ => {
                if parts.len() == 1 {
                    if let Some(schema) = &self.schema {
                        parts.insert(0, schema.clone());
                    }
                }
                if parts.len() == 2 {
                    parts.insert(0, self.database.clone());
                }
                parts
            }
        }
    }
}

/// Removes from `ddl` every statement that creates or alters an object the
/// walk under `container` would skip: one matched by an exclusion rule, one
/// of an excluded type, or one inside an excluded database or schema.
pub fn filter_container_ddl(
    ddl: &str,
    container: &ObjectRef,
    exclusions: &ExclusionChecker,
) -> FilteredDdl {
    let mut scope = Scope {
        database: container.database_name().to_string(),
        schema: (container.category == ObjectCategory::Schema)
            .then(|| container.name().to_string()),
    };
    let mut kept = String::with_capacity(ddl.len());
    let mut removed = Vec::new();

    for statement in split_statements(ddl) {
        let Some(caps) = OBJECT_HEADER.captures(statement) else {
            kept.push_str(statement);
            continue;
        };
        let kind = caps[1].split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let path = scope.qualify(&kind, split_qualified(&caps[2]));

        let excluded = exclusions.is_type_excluded(&kind)
            || (1..=path.len()).any(|n| exclusions.is_excluded(&path[..n].join(".")));
        if excluded {
            removed.push(path.join("."));
        } else {
            kept.push_str(statement);
        }
    }

    FilteredDdl { ddl: kept, removed }
}

/// DDL as it may leave the process: container DDL is filtered, any other
/// object's DDL is returned unchanged.
pub fn visible_ddl(object: &ObjectRef, ddl: String, exclusions: &ExclusionChecker) -> String {
    if !matches!(object.category, ObjectCategory::Database | ObjectCategory::Schema) {
        return ddl;
    }
    let filtered = filter_container_ddl(&ddl, object, exclusions);
    if !filtered.removed.is_empty() {
        info!(
            target: AUDIT_TARGET,
            object = %object,
            removed = ?filtered.removed,
            "Removed excluded objects from container DDL"
        );
    }
    filtered.ddl
}
