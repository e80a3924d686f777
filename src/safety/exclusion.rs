//! Exclusion rule enforcement.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExclusionConfig;
use crate::error::{GuardError, Result};

/// Outcome of checking one object name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionResult {
    pub is_excluded: bool,
    /// Regex source, or `objectType:<NAME>` for literal matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

impl ExclusionResult {
    /// An allowed name.
    pub fn allowed() -> Self {
        Self::default()
    }

    /// An excluded name with the rule that matched.
    pub fn excluded(matched_pattern: impl Into<String>) -> Self {
        Self {
            is_excluded: true,
            matched_pattern: Some(matched_pattern.into()),
        }
    }
}

/// Checks object names against ordered regex patterns and literal tokens.
///
/// Built once from configuration and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ExclusionChecker {
    patterns: Vec<(String, Regex)>,
    object_types: HashSet<String>,
}

impl ExclusionChecker {
    /// Compiles the configured rules.
    ///
    /// An invalid regex source is an `INVALID_INPUT` error; rules are never
    /// dropped.
    pub fn new(config: &ExclusionConfig) -> Result<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(|source| {
                RegexBuilder::new(source)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (source.clone(), re))
                    .map_err(|e| {
                        GuardError::invalid_input(format!(
                            "Invalid exclusion pattern '{source}': {e}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let object_types = config
            .object_types
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            patterns,
            object_types,
        })
    }

    /// Checks `name`: regexes in order (first match wins), then the
    /// uppercased name against the literal set.
    pub fn check(&self, name: &str) -> ExclusionResult {
        if let Some((source, _)) = self.patterns.iter().find(|(_, re)| re.is_match(name)) {
            debug!(name, pattern = %source, "Name matched exclusion pattern");
            return ExclusionResult::excluded(source.clone());
        }

        let upper = name.to_uppercase();
        if self.object_types.contains(&upper) {
            return ExclusionResult::excluded(format!("objectType:{upper}"));
        }

        ExclusionResult::allowed()
    }

    /// Boolean projection of [`check`](Self::check).
    pub fn is_excluded(&self, name: &str) -> bool {
        self.check(name).is_excluded
    }

    /// Returns true if a whole object type (e.g. `STAGE`) is blocked.
    pub fn is_type_excluded(&self, object_type: &str) -> bool {
        self.object_types.contains(&object_type.to_uppercase())
    }

    /// Returns the first excluded name in `names`, with its result.
    pub fn first_excluded<'a, I>(&self, names: I) -> Option<(String, ExclusionResult)>
    where
        I: IntoIterator<Item = &'a String>,
    {
        names.into_iter().find_map(|name| {
            let result = self.check(name);
            result.is_excluded.then(|| (name.clone(), result))
        })
    }
}
