//! Query safety module.
//!
//! Classifies SQL as metadata, scalar, or row-returning data queries,
//! extracts the objects a statement references, checks names against
//! the configured exclusion rules, and filters container DDL.

mod classifier;
mod ddl;
mod exclusion;
mod extractor;

pub use classifier::{classify_query, rules, ClassificationRule, QueryClassifier};
pub use ddl::visible_ddl;
pub use exclusion::{ExclusionChecker, ExclusionResult};
pub use extractor::extract_object_names;

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of answer a query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Catalog / structure information (SHOW, DESCRIBE, GET_DDL, INFORMATION_SCHEMA).
    Metadata,
    /// A single computed value (aggregates, context functions).
    Scalar,
    /// Anything that may return row-level data.
    Data,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::Scalar => write!(f, "scalar"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// Result of classifying a SQL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClassification {
    /// The determined query type.
    #[serde(rename = "type")]
    pub query_type: QueryType,
    /// Which rule produced the type.
    pub reason: String,
}

impl QueryClassification {
    /// Creates a new classification.
    pub fn new(query_type: QueryType, reason: impl Into<String>) -> Self {
        Self {
            query_type,
            reason: reason.into(),
        }
    }

    /// Returns true if the query may return row-level data.
    pub fn may_return_rows(&self) -> bool {
        self.query_type == QueryType::Data
    }
}
