//! End-to-end tests of the guardrail and repository engines against a
//! scripted warehouse.

pub mod common;
pub mod guardrail_test;
pub mod staleness_test;
pub mod sync_test;
