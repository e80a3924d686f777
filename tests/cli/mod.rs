//! Tests that run the snowguard binary.

pub mod common;
pub mod commands_test;
