//! Warehouse object catalog.
//!
//! Names the object hierarchy (database → schema → objects), builds the
//! `SHOW` / `GET_DDL` statements for it, and parses the CLI's untyped output
//! into rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{GuardError, Result};
use crate::executor::Session;

/// A parsed output row: column name to value.
pub type Row = Map<String, Value>;

/// The kinds of object the repository mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectCategory {
    Database,
    Schema,
    Table,
    View,
    Function,
    Procedure,
    Stage,
    Task,
}

impl ObjectCategory {
    /// Categories that live inside a schema, in walk order.
    pub const SCHEMA_CHILDREN: [ObjectCategory; 6] = [
        Self::Table,
        Self::View,
        Self::Function,
        Self::Procedure,
        Self::Stage,
        Self::Task,
    ];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::View => "view",
            Self::Function => "function",
            Self::Procedure => "procedure",
            Self::Stage => "stage",
            Self::Task => "task",
        }
    }

    /// SQL object-type keyword (`GET_DDL` first argument).
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Database => "DATABASE",
            Self::Schema => "SCHEMA",
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::Stage => "STAGE",
            Self::Task => "TASK",
        }
    }

    /// Object-type phrase used with `SHOW`.
    pub fn show_keyword(&self) -> &'static str {
        match self {
            Self::Database => "DATABASES",
            Self::Schema => "SCHEMAS",
            Self::Table => "TABLES",
            Self::View => "VIEWS",
            Self::Function => "USER FUNCTIONS",
            Self::Procedure => "PROCEDURES",
            Self::Stage => "STAGES",
            Self::Task => "TASKS",
        }
    }

    /// Repository sub-directory for schema children.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Database => "databases",
            Self::Schema => "schemas",
            Self::Table => "tables",
            Self::View => "views",
            Self::Function => "functions",
            Self::Procedure => "procedures",
            Self::Stage => "stages",
            Self::Task => "tasks",
        }
    }

    /// Functions and procedures are addressed by name plus argument types.
    pub fn has_signature(&self) -> bool {
        matches!(self, Self::Function | Self::Procedure)
    }

    /// Number of name parts in a fully-qualified reference.
    pub fn depth(&self) -> usize {
        match self {
            Self::Database => 1,
            Self::Schema => 2,
            _ => 3,
        }
    }

    /// Parses a category from its singular or plural name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "database" | "databases" => Some(Self::Database),
            "schema" | "schemas" => Some(Self::Schema),
            "table" | "tables" => Some(Self::Table),
            "view" | "views" => Some(Self::View),
            "function" | "functions" => Some(Self::Function),
            "procedure" | "procedures" => Some(Self::Procedure),
            "stage" | "stages" => Some(Self::Stage),
            "task" | "tasks" => Some(Self::Task),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectCategory {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| GuardError::invalid_input(format!("Unknown object type: {s}")))
    }
}

/// A reference to one remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub category: ObjectCategory,
    /// Ancestor names followed by the object's own name.
    pub path: Vec<String>,
    /// Argument types, e.g. `(NUMBER, VARCHAR)`, for functions and procedures.
    pub arguments: Option<String>,
}

impl ObjectRef {
    /// A database.
    pub fn database(name: impl Into<String>) -> Self {
        Self {
            category: ObjectCategory::Database,
            path: vec![name.into()],
            arguments: None,
        }
    }

    /// A schema inside `database`.
    pub fn schema(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            category: ObjectCategory::Schema,
            path: vec![database.into(), schema.into()],
            arguments: None,
        }
    }

    /// A schema child such as a table or view.
    pub fn object(
        category: ObjectCategory,
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            category,
            path: vec![database.into(), schema.into(), name.into()],
            arguments: None,
        }
    }

    /// Attaches argument types.
    pub fn with_arguments(mut self, arguments: Option<String>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Parses a dotted (optionally double-quoted) fully-qualified name.
    ///
    /// Functions and procedures may carry their argument types, as in
    /// `DB.S.F(NUMBER)`.
    pub fn parse(category: ObjectCategory, qualified: &str) -> Result<Self> {
        let (qualified, arguments) = match qualified.find('(') {
            Some(start) if category.has_signature() => {
                let arguments = parse_arguments(&qualified[start..]).ok_or_else(|| {
                    GuardError::invalid_input(format!("Unbalanced argument list in '{qualified}'"))
                })?;
                (qualified[..start].trim_end(), Some(arguments))
            }
            _ => (qualified, None),
        };
        let path = split_qualified(qualified);
        if path.len() != category.depth() || path.iter().any(String::is_empty) {
            return Err(GuardError::invalid_input(format!(
                "Expected a {}-part name for {category}, got '{qualified}'",
                category.depth()
            )));
        }
        Ok(Self {
            category,
            path,
            arguments,
        })
    }

    /// The object's own name.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// The owning database.
    pub fn database_name(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    /// The owning schema, for schema children.
    pub fn schema_name(&self) -> Option<&str> {
        (self.path.len() >= 3).then(|| self.path[1].as_str())
    }

    /// Ancestor names joined with `.`; the unit of exclusion matching.
    pub fn fully_qualified(&self) -> String {
        self.path.join(".")
    }

    /// Quoted identifier path for use in SQL.
    pub fn quoted(&self) -> String {
        quote_path(&self.path)
    }

    /// The `GET_DDL` object argument, including argument types if known.
    pub fn ddl_target(&self) -> String {
        match &self.arguments {
            Some(args) => format!("{}{}", self.quoted(), args),
            None => self.quoted(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fully_qualified())
    }
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub arguments: Option<String>,
}

/// Quotes one identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes every part of a path and joins them with `.`.
pub fn quote_path<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| quote_ident(p.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Escapes a string literal for SQL.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Splits `a.b.c` / `"a"."b.c"` into parts, honouring double quotes.
pub fn split_qualified(qualified: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = qualified.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Case-insensitive string field lookup.
pub fn field<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| v.as_str())
}

/// Fully-qualified name of a `SHOW` row from its `database_name`,
/// `schema_name` and `name` columns.
pub fn qualified_name_of(row: &Row) -> Option<String> {
    let name = field(row, "name")?;
    let parts: Vec<&str> = [field(row, "database_name"), field(row, "schema_name")]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .chain(std::iter::once(name))
        .collect();
    Some(parts.join("."))
}

/// Argument types from a `SHOW FUNCTIONS` `arguments` column, e.g.
/// `MY_FN(NUMBER, VARCHAR) RETURN NUMBER` → `(NUMBER, VARCHAR)`.
pub fn parse_arguments(arguments: &str) -> Option<String> {
    let start = arguments.find('(')?;
    let mut depth = 0usize;
    for (i, c) in arguments[start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(arguments[start..=start + i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses CLI output into rows.
///
/// JSON (an array of objects, an object, or an array of per-statement
/// arrays, of which the last is used) is preferred; otherwise the text is
/// read as tab-separated values with a header line.
pub fn parse_rows(stdout: &str) -> Vec<Row> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => {
            if let Some(Value::Array(last)) = items.last() {
                return last.iter().filter_map(as_row).collect();
            }
            items.iter().filter_map(as_row).collect()
        }
        Ok(Value::Object(map)) => vec![map],
        Ok(_) => Vec::new(),
        Err(_) => parse_tsv(trimmed),
    }
}

fn as_row(value: &Value) -> Option<Row> {
    value.as_object().cloned()
}

fn parse_tsv(text: &str) -> Vec<Row> {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

    lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            columns
                .iter()
                .zip(line.split('\t'))
                .map(|(c, v)| (c.to_string(), Value::String(v.to_string())))
                .collect()
        })
        .collect()
}

/// First string value of the first row, used for single-value answers
/// such as `GET_DDL`.
pub fn first_value(rows: &[Row]) -> Option<String> {
    rows.first()?
        .values()
        .next()
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Lists objects and fetches DDL through a [`Session`].
#[derive(Clone)]
pub struct Catalog {
    session: Session,
}

impl Catalog {
    /// Creates a catalog over the given session.
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Runs a statement and parses its rows.
    pub async fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let stdout = self.session.run_sql(sql).await?;
        Ok(parse_rows(&stdout))
    }

    /// `SHOW DATABASES`.
    pub async fn list_databases(&self) -> Result<Vec<CatalogEntry>> {
        let rows = self.query_rows("SHOW DATABASES").await?;
        Ok(entries(&rows, false))
    }

    /// `SHOW SCHEMAS IN DATABASE`, without the virtual `INFORMATION_SCHEMA`.
    pub async fn list_schemas(&self, database: &str) -> Result<Vec<CatalogEntry>> {
        let sql = format!("SHOW SCHEMAS IN DATABASE {}", quote_ident(database));
        let rows = self.query_rows(&sql).await?;
        Ok(entries(&rows, false)
            .into_iter()
            .filter(|e| !e.name.eq_ignore_ascii_case("INFORMATION_SCHEMA"))
            .collect())
    }

    /// `SHOW <objects> IN SCHEMA`.
    pub async fn list_objects(
        &self,
        category: ObjectCategory,
        database: &str,
        schema: &str,
    ) -> Result<Vec<CatalogEntry>> {
        let sql = format!(
            "SHOW {} IN SCHEMA {}",
            category.show_keyword(),
            quote_path(&[database, schema])
        );
        let rows = self.query_rows(&sql).await?;
        Ok(entries(&rows, category.has_signature()))
    }

    /// Fills in argument types for a function or procedure reference that
    /// lacks them, by listing its schema.
    pub async fn resolve_arguments(&self, object: &ObjectRef) -> Result<ObjectRef> {
        if !object.category.has_signature() || object.arguments.is_some() {
            return Ok(object.clone());
        }
        let schema = object.schema_name().unwrap_or_default();
        let listed = self
            .list_objects(object.category, object.database_name(), schema)
            .await?;
        let arguments = listed
            .into_iter()
            .find(|e| e.name == object.name())
            .and_then(|e| e.arguments);
        Ok(object.clone().with_arguments(arguments))
    }

    /// Fetches an object's DDL. `Ok(None)` means the CLI answered but with
    /// no DDL text.
    pub async fn fetch_ddl(&self, object: &ObjectRef) -> Result<Option<String>> {
        let sql = format!(
            "SELECT GET_DDL({}, {})",
            sql_literal(object.category.keyword()),
            sql_literal(&object.ddl_target())
        );
        let rows = self.query_rows(&sql).await?;
        let ddl = first_value(&rows).filter(|d| !d.trim().is_empty());
        debug!(
            object = %object,
            found = ddl.is_some(),
            "Fetched DDL"
        );
        Ok(ddl)
    }
}

fn entries(rows: &[Row], with_arguments: bool) -> Vec<CatalogEntry> {
    rows.iter()
        .filter_map(|row| {
            let name = field(row, "name")?.to_string();
            let arguments = if with_arguments {
                field(row, "arguments").and_then(parse_arguments)
            } else {
                None
            };
            Some(CatalogEntry { name, arguments })
        })
        .collect()
}
