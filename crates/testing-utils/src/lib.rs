//! Test utilities shared across the workspace
//!
//! Builders for domain entities, a throwaway SQLite database helper, and
//! in-memory mock repositories for fast scheduler-level tests.

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::{ExpressionBuilder, TaskBuilder};
pub use helpers::{test_database, TestDatabase};
pub use mocks::{MockExpressionRepository, MockTaskRepository};
