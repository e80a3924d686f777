//! Query classification.
//!
//! Classification is an ordered table of anchored, case-insensitive
//! patterns. The first matching rule wins, so every metadata rule sits above
//! every scalar rule: `SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES` is
//! metadata, not scalar.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use super::{QueryClassification, QueryType};

/// Reason reported when no rule matches.
const DEFAULT_REASON: &str = "default: may return row data";

/// One entry of the classification table.
#[derive(Debug)]
pub struct ClassificationRule {
    pub pattern: Regex,
    pub query_type: QueryType,
    pub reason: &'static str,
}

fn rule(pattern: &str, query_type: QueryType, reason: &'static str) -> ClassificationRule {
    let pattern = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("built-in classification pattern must compile");
    ClassificationRule {
        pattern,
        query_type,
        reason,
    }
}

static RULES: LazyLock<Vec<ClassificationRule>> = LazyLock::new(|| {
    use QueryType::{Metadata, Scalar};
    vec![
        rule(r"^(DESCRIBE|DESC)\s", Metadata, "DESCRIBE statement"),
        rule(r"^SHOW\s", Metadata, "SHOW statement"),
        rule(r"^LIST\s", Metadata, "LIST statement"),
        rule(r"^(SELECT\s+)?GET_DDL\s*\(", Metadata, "GET_DDL call"),
        rule(
            r#"^SELECT\s[^;]*\bFROM\s+("?[\w$]+"?\.)?"?INFORMATION_SCHEMA\b"#,
            Metadata,
            "INFORMATION_SCHEMA query",
        ),
        rule(r"^SELECT\s[^;]*\bFROM\s+DATA_", Metadata, "data dictionary query"),
        rule(
            r"^SELECT\s+(COUNT|SUM|AVG|MIN|MAX|COUNT_DISTINCT)\s*\(",
            Scalar,
            "aggregate function",
        ),
        rule(
            r"^SELECT\s+(CURRENT_|SESSION_|SYSTEM\$)",
            Scalar,
            "context function",
        ),
    ]
});

/// Returns the classification table in precedence order.
pub fn rules() -> &'static [ClassificationRule] {
    &RULES
}

/// SQL classifier backed by the static rule table.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryClassifier;

impl QueryClassifier {
    /// Creates a new classifier.
    pub fn new() -> Self {
        Self
    }

    /// Classifies the trimmed query text.
    pub fn classify(&self, query: &str) -> QueryClassification {
        let trimmed = query.trim();
        rules()
            .iter()
            .find(|r| r.pattern.is_match(trimmed))
            .map(|r| QueryClassification::new(r.query_type, r.reason))
            .unwrap_or_else(|| QueryClassification::new(QueryType::Data, DEFAULT_REASON))
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_query(query: &str) -> QueryClassification {
    QueryClassifier::new().classify(query)
}
