//! Result redaction.
//!
//! Every query answer leaves the guardrail as schema plus row count. The row
//! payload is the zero-sized [`NoRows`], which always serialises as `[]`, so
//! a redacted result cannot carry data whatever its input was.
//!
//! Malformed input degrades to a fixed envelope; nothing here panics or
//! echoes the raw text.

use serde::de::{Error as _, IgnoredAny};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Placeholder for any withheld value.
pub const REDACTED: &str = "[REDACTED]";

/// Error text reported when the raw result is not JSON.
pub const PARSE_FAILURE: &str = "Failed to parse result";

/// Keys that carry an explicit column schema.
const SCHEMA_KEYS: &[&str] = &["columns", "schema"];

/// Keys that carry the rows next to an explicit schema.
const ROW_KEYS: &[&str] = &["rows", "data"];

/// Metadata about one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnInfo {
    /// Creates a new column info.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// Shape of a redacted result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub columns: Vec<ColumnInfo>,
    pub row_count: usize,
}

/// The row payload of a redacted result: always the empty sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoRows;

impl Serialize for NoRows {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_seq(Some(0))?.end()
    }
}

impl<'de> Deserialize<'de> for NoRows {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<IgnoredAny>::deserialize(deserializer)?;
        if rows.is_empty() {
            Ok(NoRows)
        } else {
            Err(D::Error::custom("redacted results never carry rows"))
        }
    }
}

/// `{metadata: {columns, rowCount}, data: []}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RedactedResult {
    pub metadata: ResultMetadata,
    pub data: NoRows,
}

impl RedactedResult {
    /// Creates a redacted result from its metadata.
    pub fn new(columns: Vec<ColumnInfo>, row_count: usize) -> Self {
        Self {
            metadata: ResultMetadata { columns, row_count },
            data: NoRows,
        }
    }
}

/// Everything the redactor can return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedactionOutcome {
    /// Tabular input reduced to its schema and row count.
    Redacted(RedactedResult),
    /// Input text that was not valid JSON.
    ParseFailure { error: String, raw: String },
    /// A bare primitive.
    Scalar { value: String },
}

impl RedactionOutcome {
    fn parse_failure() -> Self {
        Self::ParseFailure {
            error: PARSE_FAILURE.to_string(),
            raw: REDACTED.to_string(),
        }
    }

    fn scalar() -> Self {
        Self::Scalar {
            value: REDACTED.to_string(),
        }
    }

    /// Returns the redacted result if the input was tabular.
    pub fn as_redacted(&self) -> Option<&RedactedResult> {
        match self {
            Self::Redacted(r) => Some(r),
            _ => None,
        }
    }

    /// Row count of tabular input, if any.
    pub fn row_count(&self) -> Option<usize> {
        self.as_redacted().map(|r| r.metadata.row_count)
    }
}

/// Redacts an already-parsed result.
pub fn redact(value: &Value) -> RedactionOutcome {
    match value {
        Value::Array(items) => RedactedResult::new(
            items.first().map(infer_columns).unwrap_or_default(),
            items.len(),
        )
        .into(),
        Value::Object(map) => match explicit_columns(map) {
            Some(columns) => {
                let row_count = ROW_KEYS
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_array))
                    .map_or(0, Vec::len);
                RedactedResult::new(columns, row_count).into()
            }
            None => RedactedResult::new(infer_columns(value), 1).into(),
        },
        _ => RedactionOutcome::scalar(),
    }
}

/// Parses and redacts a JSON string.
pub fn redact_str(raw: &str) -> RedactionOutcome {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => redact(&value),
        Err(_) => RedactionOutcome::parse_failure(),
    }
}

impl From<RedactedResult> for RedactionOutcome {
    fn from(result: RedactedResult) -> Self {
        Self::Redacted(result)
    }
}

/// JSON type name used for inferred columns.
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Columns from the key/type shape of one row.
fn infer_columns(row: &Value) -> Vec<ColumnInfo> {
    match row {
        Value::Object(fields) => fields
            .iter()
            .map(|(name, v)| ColumnInfo::new(name.clone(), json_type(v), v.is_null()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Columns from a `columns`/`schema` array, if the object carries one.
fn explicit_columns(map: &Map<String, Value>) -> Option<Vec<ColumnInfo>> {
    let entries = SCHEMA_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))?;

    Some(entries.iter().filter_map(column_from_schema).collect())
}

fn column_from_schema(entry: &Value) -> Option<ColumnInfo> {
    match entry {
        Value::String(name) => Some(ColumnInfo::new(name.clone(), "unknown", true)),
        Value::Object(fields) => {
            let name = fields.get("name")?.as_str()?;
            let data_type = ["type", "data_type", "dataType"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(Value::as_str))
                .unwrap_or("unknown");
            let nullable = match fields.get("nullable").or_else(|| fields.get("null?")) {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => matches!(s.to_uppercase().as_str(), "Y" | "YES" | "TRUE"),
                _ => true,
            };
            Some(ColumnInfo::new(name, data_type, nullable))
        }
        _ => None,
    }
}
