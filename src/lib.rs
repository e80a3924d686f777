//! snowguard - a metadata-only guardrail for the Snowflake CLI.
//!
//! Statements are classified, checked against exclusion rules and answered
//! with schema plus row count only. The repository engine mirrors object DDL
//! to disk and detects when the local copy has gone stale.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod guardrail;
pub mod logging;
pub mod redact;
pub mod repository;
pub mod safety;
