//! Mock executor for testing.
//!
//! Answers scripted SQL by substring match and records every invocation, so
//! the guardrail and repository engines can be exercised without a
//! warehouse CLI installed.

use super::{CommandExecutor, CommandOutput, ExecOptions};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock executor that returns predefined outputs.
///
/// Rules are checked in insertion order against the SQL text (the `-q`
/// argument) or, when there is none, the space-joined arguments. The first
/// rule whose pattern is a substring wins. Unmatched calls succeed with an
/// empty JSON array.
#[derive(Default)]
pub struct MockExecutor {
    rules: Vec<(String, CommandOutput)>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockExecutor {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule returning `output` for calls containing `pattern`.
    pub fn on(mut self, pattern: impl Into<String>, output: CommandOutput) -> Self {
        self.rules.push((pattern.into(), output));
        self
    }

    /// Adds a rule returning `stdout` with exit code 0.
    pub fn respond(self, pattern: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.on(pattern, CommandOutput::success(stdout))
    }

    /// Adds a rule returning `stderr` with exit code 1.
    pub fn fail(self, pattern: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.on(pattern, CommandOutput::failure(1, stderr))
    }

    /// Returns every recorded argument vector.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Returns the SQL text of every recorded call.
    pub fn sql_calls(&self) -> Vec<String> {
        self.calls().iter().filter_map(|args| sql_of(args)).collect()
    }

    fn lookup(&self, key: &str) -> CommandOutput {
        self.rules
            .iter()
            .find(|(pattern, _)| key.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::success("[]"))
    }
}

fn sql_of(args: &[String]) -> Option<String> {
    args.iter()
        .position(|a| a == "-q")
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(
        &self,
        args: &[String],
        _options: &ExecOptions,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.to_vec());
        }
        let key = sql_of(args).unwrap_or_else(|| args.join(" "));
        Ok(self.lookup(&key))
    }
}
